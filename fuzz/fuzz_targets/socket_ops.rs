//! Fuzz target for pipe lifecycle sequences
//!
//! Replays arbitrary attach / detach / readiness / send / receive sequences
//! against a raw socket and checks that the output set always matches the
//! linked pipe records.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use nanomesh_core::{MemoryPipe, Message, Pipe, PipeId, RawRouter, Socket};

#[derive(Debug, Arbitrary)]
enum Op {
    Attach(u8),
    Detach(u8),
    Writable(u8),
    Inject(u8, Vec<u8>),
    Send(Vec<u8>),
    Recv,
    Flush,
}

fuzz_target!(|ops: Vec<Op>| {
    let mut router: RawRouter<MemoryPipe> = RawRouter::new();
    let mut pipes: Vec<(PipeId, MemoryPipe, MemoryPipe)> = Vec::new();

    for op in ops {
        match op {
            Op::Attach(priority) => {
                let (near, far) = MemoryPipe::pair();
                if let Ok(id) = router.attach(near.clone().with_priority(priority)) {
                    pipes.push((id, near, far));
                }
            }
            Op::Detach(i) if !pipes.is_empty() => {
                let (id, _, _) = pipes.swap_remove(usize::from(i) % pipes.len());
                assert!(router.detach(id).is_some());
            }
            Op::Writable(i) if !pipes.is_empty() => {
                let (id, _, _) = &pipes[usize::from(i) % pipes.len()];
                assert!(router.mark_writable(*id).is_ok());
            }
            Op::Inject(i, body) if !pipes.is_empty() => {
                let (id, _, far) = &mut pipes[usize::from(i) % pipes.len()];
                far.send(Message::new(body));
                far.flush();
                assert!(router.mark_readable(*id).is_ok());
            }
            Op::Send(body) => {
                assert!(router.send(Message::new(body)).is_ok());
            }
            Op::Recv => {
                let _ = router.recv();
            }
            Op::Flush => {
                for (_, near, _) in &pipes {
                    near.flush();
                }
            }
            _ => {}
        }
        assert_eq!(router.output_len(), router.table().linked_count());
    }
});
