use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use nanomesh_core::{
    FairQueue, Message, PeerName, Pipe, PipeStatus, PipeTable, RawRouter, RouterConfig, Socket,
};

/// Pipe that accepts everything and never releases
struct SinkPipe {
    pending: Option<Message>,
}

impl Pipe for SinkPipe {
    fn send(&mut self, _msg: Message) -> PipeStatus {
        PipeStatus::Continue
    }

    fn recv(&mut self) -> Option<(Message, PipeStatus)> {
        self.pending.take().map(|msg| (msg, PipeStatus::Release))
    }
}

/// Router with `pipes` linked pipes, half named "even" and half "odd!"
fn linked_router(pipes: usize) -> RawRouter<SinkPipe> {
    let mut router = RawRouter::with_config(&RouterConfig::named("bnch")).unwrap();
    for i in 0..pipes {
        let name = if i % 2 == 0 { "even" } else { "odd!" };
        let id = router
            .attach(SinkPipe {
                pending: Some(Message::from(name)),
            })
            .unwrap();
        router.mark_writable(id).unwrap();
        router.mark_writable(id).unwrap();
        router.mark_readable(id).unwrap();
        // The first inbound message is consumed as the peer name.
        assert!(router.recv().is_none());
    }
    router
}

fn bench_named_multicast(c: &mut Criterion) {
    let mut group = c.benchmark_group("named_multicast");

    for pipes in [1usize, 8, 64, 512] {
        let mut router = linked_router(pipes);
        let msg = Message::from_static(b"even\xAA\xBB\xCC\xDD");

        group.throughput(Throughput::Elements(pipes as u64));
        group.bench_with_input(BenchmarkId::from_parameter(pipes), &pipes, |b, _| {
            b.iter(|| router.send(black_box(msg.clone())))
        });
    }

    group.finish();
}

fn bench_unroutable(c: &mut Criterion) {
    let mut router = linked_router(64);
    let msg = Message::from_static(b"nobody-home");

    c.bench_function("unroutable_64_pipes", |b| {
        b.iter(|| router.send(black_box(msg.clone())))
    });
}

fn bench_name_match(c: &mut Criterion) {
    let name = PeerName::from("even");
    let body = vec![b'e', b'v', b'e', b'n', 0x42, 0x42];

    c.bench_function("peer_name_match", |b| {
        b.iter(|| black_box(name).matches(black_box(&body)))
    });
}

fn bench_fair_queue_recv(c: &mut Criterion) {
    let mut group = c.benchmark_group("fair_queue_recv");

    for pipes in [4usize, 64] {
        group.throughput(Throughput::Elements(pipes as u64));
        group.bench_with_input(BenchmarkId::from_parameter(pipes), &pipes, |b, &pipes| {
            b.iter(|| {
                let mut table = PipeTable::new();
                let mut fq = FairQueue::new();
                for i in 0..pipes {
                    let pipe = SinkPipe {
                        pending: Some(Message::from_static(b"data")),
                    };
                    let id = table.insert(pipe, (i % 16) as u8 + 1);
                    fq.register(&mut table, id);
                    fq.mark_readable(&mut table, id);
                }
                while fq.recv(&mut table).is_some() {}
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_named_multicast,
    bench_unroutable,
    bench_name_match,
    bench_fair_queue_recv
);
criterion_main!(benches);
