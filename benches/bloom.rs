use criterion::{black_box, criterion_group, criterion_main, Criterion};
use fastvm::{logs_bloom, Address, BlockEnv, CallKind, ExecutionContext, Log, Word};
use primitive_types::H256;

fn sample_logs(count: usize) -> Vec<Log> {
	(0..count)
		.map(|i| Log {
			address: Address::repeat_byte(i as u8),
			topics: vec![H256::repeat_byte(0x11), H256::repeat_byte(i as u8)],
			data: vec![0u8; 32],
		})
		.collect()
}

fn bench_bloom(c: &mut Criterion) {
	let mut group = c.benchmark_group("bloom");

	for count in [1usize, 16, 256] {
		let logs = sample_logs(count);
		group.bench_function(format!("logs_bloom/{}", count), |b| {
			b.iter(|| black_box(logs_bloom(black_box(&logs))));
		});
	}

	let receipt = logs_bloom(&sample_logs(64));
	let query = sample_logs(1)[0].bloom();
	group.bench_function("contains", |b| {
		b.iter(|| black_box(receipt.contains(black_box(&query))));
	});

	group.finish();
}

fn bench_context(c: &mut Criterion) {
	let block = BlockEnv {
		coinbase: Address::repeat_byte(0xc0),
		number: 1,
		timestamp: 1_600_000_000,
		nrg_limit: 15_000_000,
		difficulty: Word::from(16u32),
	};
	let hash = H256::repeat_byte(0x77);
	let context = ExecutionContext::new(
		hash.as_bytes(),
		Address::repeat_byte(1),
		Address::repeat_byte(2),
		Address::repeat_byte(3),
		Word::ONE,
		1_000_000,
		Word::ZERO,
		vec![0xab; 128],
		0,
		CallKind::Call,
		0,
		block,
	)
	.expect("valid context");
	let encoded = context.to_bytes();

	c.bench_function("context/to_bytes", |b| {
		b.iter(|| black_box(context.to_bytes()));
	});
	c.bench_function("context/decode", |b| {
		b.iter(|| black_box(ExecutionContext::decode(hash.as_bytes(), black_box(&encoded))));
	});
}

criterion_group!(benches, bench_bloom, bench_context);
criterion_main!(benches);
