//! Benchmarks for the generation stepper and pattern analyzer.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use life_engine::{
    compute::{Boundary, Grid, PatternAnalyzer, Rule, Simulation, Stepper},
    schema::{AnalysisConfig, PatternLibrary},
};

fn soup(size: u32, boundary: Boundary) -> Grid {
    let mut grid = Grid::new(size, size, boundary).unwrap();
    grid.randomize(0.35, 42);
    grid
}

fn bench_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("step");

    for size in [64, 256, 1024, 2048] {
        let grid = soup(size, Boundary::Wrap);
        let mut sim = Simulation::new(grid, Rule::conway());

        group.throughput(Throughput::Elements(size as u64 * size as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}x{}", size, size)),
            &size,
            |b, _| {
                b.iter(|| {
                    sim.step();
                    black_box(sim.generation());
                });
            },
        );
    }

    group.finish();
}

fn bench_boundary(c: &mut Criterion) {
    let mut group = c.benchmark_group("boundary");

    for boundary in [Boundary::Wrap, Boundary::Fixed] {
        let grid = soup(512, boundary);
        let stepper = Stepper::new();
        let rule = Rule::conway();
        let mut next = Stepper::new().step(&grid, &rule);

        group.bench_with_input(
            BenchmarkId::from_parameter(boundary),
            &boundary,
            |b, _| {
                b.iter(|| {
                    stepper.step_into(black_box(&grid), &rule, &mut next).unwrap();
                });
            },
        );
    }

    group.finish();
}

fn bench_band_rows(c: &mut Criterion) {
    let mut group = c.benchmark_group("band_rows");
    let grid = soup(1024, Boundary::Wrap);
    let rule = Rule::conway();

    for band_rows in [1, 8, 64, 1024] {
        let stepper = Stepper::with_band_rows(band_rows);
        let mut next = stepper.step(&grid, &rule);

        group.bench_with_input(
            BenchmarkId::from_parameter(band_rows),
            &band_rows,
            |b, _| {
                b.iter(|| {
                    stepper.step_into(black_box(&grid), &rule, &mut next).unwrap();
                });
            },
        );
    }

    group.finish();
}

fn bench_analyze(c: &mut Criterion) {
    let mut group = c.benchmark_group("analyze");
    group.sample_size(10);

    let library = PatternLibrary::standard();
    let analyzer = PatternAnalyzer::new(AnalysisConfig::default()).unwrap();

    for name in ["glider", "pulsar", "diehard", "r-pentomino"] {
        let pattern = library.get_by_name(name).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(name), &name, |b, _| {
            b.iter(|| analyzer.analyze_centered(black_box(pattern)).unwrap());
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_step,
    bench_boundary,
    bench_band_rows,
    bench_analyze
);
criterion_main!(benches);
