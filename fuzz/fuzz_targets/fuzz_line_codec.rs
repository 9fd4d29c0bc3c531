#![no_main]

use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;
use rpc_relay::core::{Frame, LineCodec};
use tokio_util::codec::Decoder;

fuzz_target!(|data: &[u8]| {
    // Feed the input in two chunks; no frame may exceed the limit
    let mut codec = LineCodec::new(64);
    let split = data.len() / 2;
    let mut buf = BytesMut::from(&data[..split]);
    let mut check = |buf: &mut BytesMut, eof: bool| loop {
        let frame = if eof { codec.decode_eof(buf) } else { codec.decode(buf) };
        match frame {
            Ok(Some(Frame::Line(line))) => assert!(line.len() <= 64),
            Ok(Some(Frame::Oversized(size))) => assert!(size > 64),
            Ok(None) | Err(_) => break,
        }
    };
    check(&mut buf, false);
    buf.extend_from_slice(&data[split..]);
    check(&mut buf, false);
    check(&mut buf, true);
});
