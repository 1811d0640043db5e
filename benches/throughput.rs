//! Performance benchmarks for `warp_asm`.
//!
//! Measures:
//! - Single instruction latency (per shape)
//! - Multi-instruction throughput (KB/s of source text)
//! - Label-heavy workloads (100+ labels)
//! - Realistic kernel bodies
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use warp_asm::{assemble, assemble_to_words, encode};

// ─── Single-Instruction Latency ──────────────────────────────────────────────

fn bench_single_instruction(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_instruction");

    group.bench_function("halt", |b| {
        b.iter(|| assemble_to_words(black_box("halt")).unwrap())
    });

    group.bench_function("addi", |b| {
        b.iter(|| assemble_to_words(black_box("addi x5, x5, 87")).unwrap())
    });

    group.bench_function("add", |b| {
        b.iter(|| assemble_to_words(black_box("add x1, x2, x3")).unwrap())
    });

    group.bench_function("lw", |b| {
        b.iter(|| assemble_to_words(black_box("lw x1, -4(x2)")).unwrap())
    });

    group.bench_function("sw", |b| {
        b.iter(|| assemble_to_words(black_box("sw x1, 8(x2)")).unwrap())
    });

    group.bench_function("jal", |b| {
        b.iter(|| assemble_to_words(black_box("jal x1, 2048")).unwrap())
    });

    group.bench_function("scalar_addi", |b| {
        b.iter(|| assemble_to_words(black_box("s.addi s1, s1, 1")).unwrap())
    });

    group.bench_function("sx_slt", |b| {
        b.iter(|| assemble_to_words(black_box("sx.slt s0, x1, x2")).unwrap())
    });

    group.finish();
}

// ─── Multi-Instruction Throughput ─────────────────────────────────────────────

/// Generate a block of N instructions (no labels).
fn gen_block(n: usize) -> String {
    let mut s = String::with_capacity(n * 20);
    for i in 0..n {
        match i % 6 {
            0 => s.push_str("add x1, x2, x3\n"),
            1 => s.push_str("addi x4, x4, 1\n"),
            2 => s.push_str("lw x5, 0(x6)\n"),
            3 => s.push_str("sw x5, 4(x6)\n"),
            4 => s.push_str("s.addi s1, s1, 1\n"),
            5 => s.push_str("xor x7, x8, x9\n"),
            _ => unreachable!(),
        }
    }
    s
}

fn bench_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("throughput");

    let src_100 = gen_block(100);
    group.throughput(Throughput::Bytes(src_100.len() as u64));
    group.bench_function("100_insn", |b| {
        b.iter(|| assemble_to_words(black_box(&src_100)).unwrap())
    });

    let src_1k = gen_block(1000);
    group.throughput(Throughput::Bytes(src_1k.len() as u64));
    group.bench_function("1000_insn", |b| {
        b.iter(|| assemble_to_words(black_box(&src_1k)).unwrap())
    });

    let src_5k = gen_block(5000);
    group.throughput(Throughput::Bytes(src_5k.len() as u64));
    group.bench_function("5000_insn", |b| {
        b.iter(|| assemble_to_words(black_box(&src_5k)).unwrap())
    });

    group.finish();
}

// ─── Label-Heavy Workloads ────────────────────────────────────────────────────

/// Generate N labeled instructions followed by N `jalr` references to them.
fn gen_labeled_block(n: usize) -> String {
    let mut s = String::with_capacity(n * 40);
    for i in 0..n {
        s.push_str(&format!("l{}: addi x1, x1, 1\n", i));
    }
    for i in 0..n {
        s.push_str(&format!("jalr x0, l{}\n", i));
    }
    s
}

fn bench_labels(c: &mut Criterion) {
    let mut group = c.benchmark_group("labels");

    let src = gen_labeled_block(100);
    group.throughput(Throughput::Bytes(src.len() as u64));
    group.bench_function("100_labels_100_refs", |b| {
        b.iter(|| assemble_to_words(black_box(&src)).unwrap())
    });

    group.finish();
}

// ─── Pipeline Stages ──────────────────────────────────────────────────────────

fn bench_stages(c: &mut Criterion) {
    let mut group = c.benchmark_group("stages");
    let src = gen_block(1000);

    group.bench_function("parse_only", |b| {
        b.iter(|| assemble(black_box(&src)).unwrap())
    });

    let program = assemble(&src).unwrap();
    group.bench_function("encode_only", |b| {
        b.iter(|| encode(black_box(&program)).unwrap())
    });

    group.finish();
}

// ─── Realistic Kernels ────────────────────────────────────────────────────────

fn bench_realistic(c: &mut Criterion) {
    let mut group = c.benchmark_group("realistic");

    let kernel = "\
.blocks 4
.warps 8
# per-lane element offset
slli x1, x0, 2
lw x2, 0(x1)
lw x3, 1024(x1)
add x4, x2, x3
sw x4, 2048(x1)
s.addi s1, s1, 1
sx.slt s2, x1, x5
jalr x0, done
done: halt
";
    group.bench_function("vector_add_kernel", |b| {
        b.iter(|| assemble_to_words(black_box(kernel)).unwrap())
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_single_instruction,
    bench_throughput,
    bench_labels,
    bench_stages,
    bench_realistic,
);
criterion_main!(benches);
