//! Payload-to-text stream consumer

use crate::channel::{ChannelError, ChannelResult, MessageChannel};
use crate::core::sync::lock_mutex;
use crate::message::{Message, Payload};
use crate::stream::{StreamError, StreamResult};
use std::io::{self, BufWriter, Stderr, Stdout, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Writes each message payload to a character stream
///
/// Text and character payloads are written verbatim, byte payloads are
/// decoded as UTF-8 (invalid sequences become U+FFFD) and anything else is
/// written through its `Display` form. The stream is flushed after every
/// message. Null payloads are dropped with a warning.
///
/// # Example
///
/// ```rust
/// use correlate::message::MessageBuilder;
/// use correlate::stream::CharacterStreamWritingConsumer;
///
/// let consumer = CharacterStreamWritingConsumer::new(Vec::new());
/// consumer.set_append_newline(true);
/// consumer.on_message(&MessageBuilder::with_payload("hello").build()).unwrap();
/// assert_eq!(consumer.into_inner().unwrap(), b"hello\n");
/// ```
pub struct CharacterStreamWritingConsumer<W: Write> {
    name: String,
    writer: Mutex<BufWriter<W>>,
    append_newline: AtomicBool,
}

impl<W: Write> CharacterStreamWritingConsumer<W> {
    pub fn new(writer: W) -> Self {
        Self::named("stream", BufWriter::new(writer))
    }

    /// Buffer up to `buffer_size` bytes; zero selects the default size
    pub fn with_buffer_size(writer: W, buffer_size: usize) -> Self {
        if buffer_size == 0 {
            return Self::new(writer);
        }
        Self::named("stream", BufWriter::with_capacity(buffer_size, writer))
    }

    fn named(name: &str, writer: BufWriter<W>) -> Self {
        Self {
            name: name.to_string(),
            writer: Mutex::new(writer),
            append_newline: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Write a newline after every payload
    pub fn set_append_newline(&self, append_newline: bool) {
        self.append_newline.store(append_newline, Ordering::Release);
    }

    pub fn appends_newline(&self) -> bool {
        self.append_newline.load(Ordering::Acquire)
    }

    /// Write the payload of `message` and flush
    pub fn on_message(&self, message: &Message) -> StreamResult<()> {
        let payload = message.payload();
        if payload.is_null() {
            log::warn!(
                "{} received null payload (message {}); nothing written",
                self.name,
                message.id()
            );
            return Ok(());
        }

        let mut writer = lock_mutex(&self.writer, &self.name, |message| {
            StreamError::Synchronisation { message }
        })?;
        write_payload(&mut *writer, payload)?;
        if self.appends_newline() {
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Flush and return the underlying writer
    pub fn into_inner(self) -> StreamResult<W> {
        let writer = self
            .writer
            .into_inner()
            .map_err(|_| StreamError::Synchronisation {
                message: format!("{} writer poisoned", self.name),
            })?;
        writer
            .into_inner()
            .map_err(|e| StreamError::from(e.into_error()))
    }
}

impl CharacterStreamWritingConsumer<Stdout> {
    /// Consumer writing to standard output
    pub fn stdout() -> Self {
        Self::named("stdout", BufWriter::new(io::stdout()))
    }
}

impl CharacterStreamWritingConsumer<Stderr> {
    /// Consumer writing to standard error
    pub fn stderr() -> Self {
        Self::named("stderr", BufWriter::new(io::stderr()))
    }
}

fn write_payload(writer: &mut impl Write, payload: &Payload) -> io::Result<()> {
    match payload {
        Payload::Text(text) => writer.write_all(text.as_bytes()),
        Payload::Bytes(bytes) => writer.write_all(String::from_utf8_lossy(bytes).as_bytes()),
        other => write!(writer, "{}", other),
    }
}

impl<W: Write + Send> MessageChannel for CharacterStreamWritingConsumer<W> {
    fn send(&self, message: Message) -> ChannelResult<()> {
        self.on_message(&message)
            .map_err(|e| ChannelError::Delivery {
                channel: self.name.clone(),
                source: Box::new(e),
            })
    }
}
