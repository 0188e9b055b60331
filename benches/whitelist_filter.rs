use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use sattle::constants::{Degree, RADEG};
use sattle::visit::{Track, Visit, VisitTracks};
use sattle::visit_cache::VisitCacheEntry;
use sattle::whitelist::{DiaSource, WhitelistFilter};

/// Tracks scattered within 10° of the boresight, each 0.1° to 2° long.
fn random_entry(rng: &mut StdRng, n_tracks: usize) -> VisitCacheEntry {
    let tracks = (0..n_tracks as u64)
        .map(|catalog_number| {
            let start_ra = rng.random_range(0.0..20.0);
            let start_dec = rng.random_range(-10.0..10.0);
            let length = rng.random_range(0.1..2.0);
            let angle: f64 = rng.random_range(0.0..std::f64::consts::TAU);
            Track {
                catalog_number,
                start_ra,
                start_dec,
                end_ra: start_ra + length * angle.cos(),
                end_dec: start_dec + length * angle.sin(),
            }
        })
        .collect();
    let visit = Visit::new(1, 60000.0, 60000.0007, 10.0, 0.0).unwrap();
    let computed = VisitTracks {
        tracks,
        skipped: vec![],
        search_radius: 10.0,
    };
    VisitCacheEntry::new(visit, computed, false, 1)
}

fn square_bbox(ra: Degree, dec: Degree, half: Degree) -> Vec<[Degree; 2]> {
    let half_ra = half / (dec * RADEG).cos().max(1e-6);
    vec![
        [ra - half_ra, dec - half],
        [ra + half_ra, dec - half],
        [ra + half_ra, dec + half],
        [ra - half_ra, dec + half],
    ]
}

/// Detector-sized batch: small footprints within a 0.25° patch.
fn random_sources(rng: &mut StdRng, n_sources: usize) -> Vec<DiaSource> {
    (0..n_sources as i64)
        .map(|id| {
            let ra = 10.0 + rng.random_range(-0.125..0.125);
            let dec = rng.random_range(-0.125..0.125);
            DiaSource::new(id, square_bbox(ra, dec, 0.0005))
        })
        .collect()
}

fn bench_filter(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0xDEADBEEF);
    let filter = WhitelistFilter::default();
    let sources = random_sources(&mut rng, 500);

    let mut group = c.benchmark_group("whitelist_filter/500_sources");
    for n_tracks in [10usize, 100, 1000] {
        let entry = random_entry(&mut rng, n_tracks);
        group.bench_with_input(BenchmarkId::from_parameter(n_tracks), &entry, |b, entry| {
            b.iter(|| filter.filter(black_box(entry), 0, black_box(&sources)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_filter);
criterion_main!(benches);
