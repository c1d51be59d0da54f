use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use msp430_analyzer::sweep::{decode_many, sweep};
use msp430_analyzer::{Decoder, Image, SweepOptions};

/// A small routine repeated to fill the image: push/sub SP frame setup,
/// extension-word moves, a jump table and a return.
const ROUTINE: &[u16] = &[
    0x120B, // push R11
    0x8031, 0x0004, // sub #4, SP
    0x1840, 0x40B2, 0x5A80, 0x0120, // movx.w #5A80h, &120h
    0x9035, 0x0005, // cmp #5, R5
    0x2C04, // jhs +4
    0x5505, // rla R5
    0x4510, 0x0000, // mov 0(R5), PC
    0x5031, 0x0004, // add #4, SP
    0x413B, // pop R11
    0x4130, // ret
];

fn image(repeat: usize) -> Vec<u8> {
    ROUTINE
        .iter()
        .cycle()
        .take(ROUTINE.len() * repeat)
        .flat_map(|w| w.to_le_bytes())
        .collect()
}

fn bench_decode(c: &mut Criterion) {
    let bytes = image(256);
    let image = Image::new(0xC000, &bytes);
    let decoder = Decoder::new();
    let addresses: Vec<u32> = (0..bytes.len() as u32).step_by(2).map(|a| 0xC000 + a).collect();

    let mut group = c.benchmark_group("decode");
    group.throughput(Throughput::Bytes(bytes.len() as u64));
    group.bench_function("every_word", |b| {
        b.iter(|| decode_many(&decoder, black_box(&image), &addresses))
    });
    group.bench_function("canonical", |b| {
        let raw = Decoder::canonical();
        b.iter(|| decode_many(&raw, black_box(&image), &addresses))
    });
    group.finish();
}

fn bench_sweep(c: &mut Criterion) {
    let bytes = image(256);
    let options = SweepOptions::new().with_base(0xC000);

    let mut group = c.benchmark_group("sweep");
    group.throughput(Throughput::Bytes(bytes.len() as u64));
    group.bench_function("analyze", |b| b.iter(|| sweep(black_box(&bytes), &options)));
    group.finish();
}

criterion_group!(benches, bench_decode, bench_sweep);
criterion_main!(benches);
