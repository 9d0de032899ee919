//! Response body type
//!
//! Every layer speaks `Response<ResponseBody>`: file contents are streamed from
//! disk, buffered or generated bodies are wrapped in `Full`.

use bytes::Bytes;
use futures_util::TryStreamExt;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Empty, Full, StreamBody};
use hyper::body::Frame;
use std::io;
use tokio::io::AsyncReadExt;
use tokio_util::io::ReaderStream;

pub type ResponseBody = UnsyncBoxBody<Bytes, io::Error>;

pub fn empty() -> ResponseBody {
    Empty::<Bytes>::new()
        .map_err(|never| match never {})
        .boxed_unsync()
}

pub fn full(data: impl Into<Bytes>) -> ResponseBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed_unsync()
}

/// Stream at most `len` bytes from the file's current position
pub fn file(file: tokio::fs::File, len: u64) -> ResponseBody {
    let stream = ReaderStream::new(file.take(len)).map_ok(Frame::data);
    StreamBody::new(stream).boxed_unsync()
}
