//! Fuzz target for routing header handling
//!
//! Feeds arbitrary headers and bodies through the raw socket in both
//! directions. Sends must either succeed or hand the message back; inbound
//! traffic must never surface with anything but an 8-byte pipe token.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use nanomesh_core::{
    MemoryPipe, Message, Pipe, PipeToken, RawRouter, RouterConfig, Socket, TOKEN_SIZE,
};

#[derive(Debug, Arbitrary)]
struct Input {
    outbound: Vec<(Vec<u8>, Vec<u8>)>,
    inbound: Vec<(Vec<u8>, Vec<u8>)>,
}

fuzz_target!(|input: Input| {
    let Ok(mut router) = RawRouter::<MemoryPipe>::with_config(&RouterConfig::named("fuzz")) else {
        return;
    };
    let (near, mut far) = MemoryPipe::pair();
    let Ok(id) = router.attach(near) else {
        return;
    };
    let _ = router.mark_writable(id);
    let _ = router.mark_writable(id);

    for (header, body) in input.outbound {
        let len = header.len();
        match router.send(Message::with_header(header, body)) {
            Ok(()) => assert!(len == 0 || len == TOKEN_SIZE),
            Err(err) => assert!(err.error.is_invalid_argument()),
        }
    }

    for (header, body) in input.inbound {
        far.send(Message::with_header(header, body));
    }
    far.flush();
    let _ = router.mark_readable(id);

    while let Some(msg) = router.recv() {
        let token = PipeToken::from_slice(msg.header()).expect("8-byte pipe token");
        assert_eq!(token.pipe_id(), id);
    }
});
