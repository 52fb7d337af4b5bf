//! Benchmarks for the simulation backends
//!
//! Run with: cargo bench -p qcbench-sim

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use qcbench_ir::Circuit;
use qcbench_sim::{DensityMatrix, NoiseModel, Operator, PauliSum, QuantumState, Statevector};

/// Benchmark ideal statevector simulation of QFT circuits
fn bench_statevector_qft(c: &mut Criterion) {
    let mut group = c.benchmark_group("statevector_qft");

    for num_qubits in &[4u32, 8, 12, 16] {
        let circuit = Circuit::qft(*num_qubits).unwrap();
        group.bench_with_input(
            BenchmarkId::new("from_circuit", num_qubits),
            &circuit,
            |b, circuit| {
                b.iter(|| Statevector::from_circuit(black_box(circuit)).unwrap());
            },
        );
    }

    group.finish();
}

/// Benchmark noisy density-matrix simulation of GHZ circuits
fn bench_density_matrix_ghz(c: &mut Criterion) {
    let mut group = c.benchmark_group("density_matrix_ghz");
    let noise = NoiseModel::default();

    for num_qubits in &[2u32, 4, 6, 8] {
        let circuit = Circuit::ghz(*num_qubits).unwrap();
        group.bench_with_input(
            BenchmarkId::new("from_circuit", num_qubits),
            &circuit,
            |b, circuit| {
                b.iter(|| DensityMatrix::from_circuit(black_box(circuit), &noise).unwrap());
            },
        );
    }

    group.finish();
}

/// Benchmark Pauli-sum expectation values
fn bench_pauli_expectation(c: &mut Criterion) {
    let circuit = Circuit::qft(12).unwrap();
    let state = Statevector::from_circuit(&circuit).unwrap();
    let labels: Vec<String> = (0..11)
        .map(|i| {
            let mut label = vec!['I'; 12];
            label[i] = 'Z';
            label[i + 1] = 'Z';
            label.into_iter().collect()
        })
        .collect();
    let op: Operator = PauliSum::from_labels(labels.iter().map(|l| (l.as_str(), 1.0)))
        .unwrap()
        .into();

    c.bench_function("pauli_expectation_12q", |b| {
        b.iter(|| state.expectation(black_box(&op)).unwrap());
    });
}

criterion_group!(
    benches,
    bench_statevector_qft,
    bench_density_matrix_ghz,
    bench_pauli_expectation
);
criterion_main!(benches);
