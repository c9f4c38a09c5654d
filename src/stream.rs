use crate::error::{FfsError, FfsResult};

/// Fixed-capacity byte region with independent read and write cursors.
///
/// The backing storage is borrowed; the caller decides where it lives (stack
/// frame or static arena). `0 <= read <= write <= capacity` holds after every
/// call, and no call ever writes part of its input.
#[derive(Debug)]
pub struct StreamBuffer<'a> {
    buffer: &'a mut [u8],
    read: usize,
    write: usize,
}

/// Snapshot of the cursors, used to roll back a multi-step encode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamMark {
    read: usize,
    write: usize,
}

impl<'a> StreamBuffer<'a> {
    /// Every byte of `buffer` is readable data.
    pub fn input(buffer: &'a mut [u8]) -> Self {
        let write = buffer.len();
        Self {
            buffer,
            read: 0,
            write,
        }
    }

    /// The first `len` bytes of `buffer` are readable data.
    pub fn input_with_len(buffer: &'a mut [u8], len: usize) -> FfsResult<Self> {
        if len > buffer.len() {
            return Err(FfsError::Overrun);
        }
        Ok(Self {
            buffer,
            read: 0,
            write: len,
        })
    }

    pub fn output(buffer: &'a mut [u8]) -> Self {
        Self {
            buffer,
            read: 0,
            write: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    pub fn data_size(&self) -> usize {
        self.write - self.read
    }

    pub fn space_size(&self) -> usize {
        self.buffer.len() - self.write
    }

    pub fn is_empty(&self) -> bool {
        self.data_size() == 0
    }

    pub fn is_full(&self) -> bool {
        self.space_size() == 0
    }

    /// Unread bytes between the read and write cursors.
    pub fn data(&self) -> &[u8] {
        &self.buffer[self.read..self.write]
    }

    pub fn matches(&self, expected: &[u8]) -> bool {
        self.data() == expected
    }

    /// Last byte written, whether or not it has been read since.
    pub fn last_written(&self) -> Option<u8> {
        self.write.checked_sub(1).map(|idx| self.buffer[idx])
    }

    pub fn write(&mut self, bytes: &[u8]) -> FfsResult<()> {
        if bytes.len() > self.space_size() {
            return Err(FfsError::Overrun);
        }
        let end = self.write + bytes.len();
        self.buffer[self.write..end].copy_from_slice(bytes);
        self.write = end;
        Ok(())
    }

    pub fn write_byte(&mut self, byte: u8) -> FfsResult<()> {
        self.write(&[byte])
    }

    pub fn write_str(&mut self, value: &str) -> FfsResult<()> {
        self.write(value.as_bytes())
    }

    /// Hands the free space to `fill`, then commits the byte count it returns.
    pub fn write_with<F>(&mut self, fill: F) -> FfsResult<usize>
    where
        F: FnOnce(&mut [u8]) -> FfsResult<usize>,
    {
        let written = fill(&mut self.buffer[self.write..])?;
        if written > self.space_size() {
            return Err(FfsError::Overrun);
        }
        self.write += written;
        Ok(written)
    }

    /// Appends the unread data of `source` and consumes it.
    pub fn append(&mut self, source: &mut StreamBuffer<'_>) -> FfsResult<()> {
        self.write(source.data())?;
        source.read = source.write;
        Ok(())
    }

    pub fn read(&mut self, len: usize) -> FfsResult<&[u8]> {
        if len > self.data_size() {
            return Err(FfsError::Underrun);
        }
        let start = self.read;
        self.read += len;
        Ok(&self.buffer[start..self.read])
    }

    pub fn read_byte(&mut self) -> FfsResult<u8> {
        Ok(self.read(1)?[0])
    }

    /// Consumes `expected`, failing without consuming anything on mismatch.
    pub fn read_expected(&mut self, expected: &[u8]) -> FfsResult<()> {
        let data = self.data();
        if expected.len() > data.len() {
            return Err(FfsError::Underrun);
        }
        if &data[..expected.len()] != expected {
            return Err(FfsError::Error);
        }
        self.read += expected.len();
        Ok(())
    }

    /// Drops the last `len` written bytes.
    pub fn unwrite(&mut self, len: usize) -> FfsResult<()> {
        if len > self.data_size() {
            return Err(FfsError::Underrun);
        }
        self.write -= len;
        Ok(())
    }

    pub fn flush(&mut self) {
        self.read = 0;
        self.write = 0;
    }

    pub fn rewind(&mut self) {
        self.read = 0;
    }

    pub fn mark(&self) -> StreamMark {
        StreamMark {
            read: self.read,
            write: self.write,
        }
    }

    pub fn reset_to(&mut self, mark: StreamMark) {
        let write = mark.write.min(self.buffer.len());
        self.write = write;
        self.read = mark.read.min(write);
    }

    /// Runs `body` against this stream and restores the cursors if it fails.
    ///
    /// Bytes past the restored write cursor may have been physically written;
    /// they are outside the data region and are overwritten by the next write.
    pub fn transaction<T, F>(&mut self, body: F) -> FfsResult<T>
    where
        F: FnOnce(&mut Self) -> FfsResult<T>,
    {
        let mark = self.mark();
        let result = body(self);
        if result.is_err() {
            self.reset_to(mark);
        }
        result
    }

    /// Empty output view starting at the read cursor, with room for the unread
    /// data and the free space. The consumed prefix stays out of reach.
    pub fn reuse_input_as_output(&mut self) -> StreamBuffer<'_> {
        StreamBuffer::output(&mut self.buffer[self.read..])
    }

    /// Empty output view over the free space after the write cursor.
    pub fn reuse_output_as_output(&mut self) -> StreamBuffer<'_> {
        StreamBuffer::output(&mut self.buffer[self.write..])
    }

    /// Splits into the consumed prefix and an input stream over the rest.
    pub fn split_at_read(self) -> (&'a mut [u8], StreamBuffer<'a>) {
        let Self {
            buffer,
            read,
            write,
        } = self;
        let (consumed, rest) = buffer.split_at_mut(read);
        (
            consumed,
            StreamBuffer {
                buffer: rest,
                read: 0,
                write: write - read,
            },
        )
    }

    /// Relocates the unread data to the tail so the head can be reused for
    /// output without clobbering it.
    pub fn move_data_to_end(&mut self) {
        let len = self.data_size();
        let end = self.buffer.len();
        self.buffer.copy_within(self.read..self.write, end - len);
        self.read = end - len;
        self.write = end;
    }

    /// Relocates the unread data to the head, reclaiming the consumed prefix.
    pub fn compact(&mut self) {
        let len = self.data_size();
        self.buffer.copy_within(self.read..self.write, 0);
        self.read = 0;
        self.write = len;
    }

    /// Rewrites the data region in place with a transform that never grows.
    ///
    /// `step` receives the unconsumed input and returns how many bytes it
    /// consumed plus up to four output bytes, or `None` to stop early. Output
    /// may never pass the end of the input consumed so far; a step that would
    /// is rejected with [`FfsError::Overrun`].
    ///
    /// The rewrite cannot be undone: on error the data region is dropped
    /// (`data_size() == 0`) so half-rewritten bytes are never read back.
    pub fn rewrite_data_in_place<F>(&mut self, step: F) -> FfsResult<()>
    where
        F: FnMut(&[u8]) -> FfsResult<Option<RewriteStep>>,
    {
        let result = self.rewrite_steps(step);
        if result.is_err() {
            self.write = self.read;
        }
        result
    }

    fn rewrite_steps<F>(&mut self, mut step: F) -> FfsResult<()>
    where
        F: FnMut(&[u8]) -> FfsResult<Option<RewriteStep>>,
    {
        let end = self.write;
        let mut source = self.read;
        let mut destination = self.read;
        while source < end {
            let Some(next) = step(&self.buffer[source..end])? else {
                break;
            };
            if next.consumed == 0 || next.len > next.bytes.len() {
                return Err(FfsError::Error);
            }
            source += next.consumed;
            if source > end || destination + next.len > source {
                return Err(FfsError::Overrun);
            }
            self.buffer[destination..destination + next.len].copy_from_slice(&next.bytes[..next.len]);
            destination += next.len;
        }
        self.write = destination;
        Ok(())
    }
}

/// One step of [`StreamBuffer::rewrite_data_in_place`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RewriteStep {
    pub consumed: usize,
    pub bytes: [u8; 4],
    pub len: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_past_space_fails_without_partial_write() {
        let mut storage = [0u8; 4];
        let mut stream = StreamBuffer::output(&mut storage);
        stream.write(b"ab").unwrap();

        assert_eq!(stream.write(b"cde"), Err(FfsError::Overrun));
        assert_eq!(stream.data(), b"ab");
        assert_eq!(stream.space_size(), 2);

        stream.write(b"cd").unwrap();
        assert!(stream.is_full());
    }

    #[test]
    fn read_past_data_is_underrun() {
        let mut storage = *b"hello";
        let mut stream = StreamBuffer::input(&mut storage);
        assert_eq!(stream.read(2).unwrap(), b"he");
        assert_eq!(stream.read(4), Err(FfsError::Underrun));
        assert_eq!(stream.data_size(), 3);
        assert_eq!(stream.read(3).unwrap(), b"llo");
        assert!(stream.is_empty());
    }

    #[test]
    fn input_with_len_rejects_length_over_capacity() {
        let mut storage = [0u8; 3];
        assert!(matches!(
            StreamBuffer::input_with_len(&mut storage, 4),
            Err(FfsError::Overrun)
        ));
    }

    #[test]
    fn read_expected_does_not_consume_on_mismatch() {
        let mut storage = *b"\"abc\"";
        let mut stream = StreamBuffer::input(&mut storage);
        assert_eq!(stream.read_expected(b"x"), Err(FfsError::Error));
        assert_eq!(stream.data_size(), 5);
        stream.read_expected(b"\"").unwrap();
        assert_eq!(stream.data(), b"abc\"");
        assert_eq!(stream.read_expected(b"abc\"!"), Err(FfsError::Underrun));
    }

    #[test]
    fn transaction_rolls_back_cursors_on_failure() {
        let mut storage = [0u8; 6];
        let mut stream = StreamBuffer::output(&mut storage);
        stream.write(b"[").unwrap();

        let result = stream.transaction(|s| {
            s.write(b"abc")?;
            s.write(b"defg")
        });

        assert_eq!(result, Err(FfsError::Overrun));
        assert_eq!(stream.data(), b"[");
        assert_eq!(stream.space_size(), 5);
        assert_eq!(stream.last_written(), Some(b'['));
    }

    #[test]
    fn reuse_input_as_output_starts_at_read_cursor() {
        let mut storage = *b"abcdef";
        let mut stream = StreamBuffer::input(&mut storage);
        stream.read(2).unwrap();
        {
            let mut output = stream.reuse_input_as_output();
            assert_eq!(output.capacity(), 4);
            assert!(output.is_empty());
            output.write(b"XY").unwrap();
        }
        assert_eq!(stream.data(), b"XYef");
    }

    #[test]
    fn reuse_output_as_output_covers_free_space() {
        let mut storage = [0u8; 8];
        let mut stream = StreamBuffer::output(&mut storage);
        stream.write(b"abc").unwrap();
        {
            let mut scratch = stream.reuse_output_as_output();
            assert_eq!(scratch.capacity(), 5);
            scratch.write(b"zz").unwrap();
        }
        assert_eq!(stream.data(), b"abc");
        assert_eq!(stream.space_size(), 5);
    }

    #[test]
    fn move_data_to_end_keeps_unread_bytes() {
        let mut storage = [0u8; 8];
        let mut stream = StreamBuffer::output(&mut storage);
        stream.write(b"xxabc").unwrap();
        stream.read(2).unwrap();

        stream.move_data_to_end();

        assert_eq!(stream.data(), b"abc");
        assert_eq!(stream.space_size(), 0);
        assert_eq!(stream.mark(), StreamMark { read: 5, write: 8 });
    }

    #[test]
    fn compact_reclaims_consumed_prefix() {
        let mut storage = *b"..data";
        let mut stream = StreamBuffer::input(&mut storage);
        stream.read(2).unwrap();
        stream.compact();
        assert_eq!(stream.data(), b"data");
        assert_eq!(stream.space_size(), 2);
    }

    #[test]
    fn split_at_read_separates_consumed_prefix() {
        let mut storage = *b"headtail";
        let mut stream = StreamBuffer::input(&mut storage);
        stream.read(4).unwrap();
        let (head, rest) = stream.split_at_read();
        assert_eq!(head, b"head");
        assert_eq!(rest.data(), b"tail");
    }

    #[test]
    fn append_moves_source_data() {
        let mut a = [0u8; 8];
        let mut b = *b"salt";
        let mut destination = StreamBuffer::output(&mut a);
        let mut source = StreamBuffer::input(&mut b);
        destination.write(b"pin").unwrap();
        destination.append(&mut source).unwrap();
        assert_eq!(destination.data(), b"pinsalt");
        assert!(source.is_empty());
    }

    #[test]
    fn rewrite_in_place_rejects_growing_step() {
        let mut storage = *b"ab";
        let mut stream = StreamBuffer::input(&mut storage);
        let result = stream.rewrite_data_in_place(|_| {
            Ok(Some(RewriteStep {
                consumed: 1,
                bytes: *b"xy\0\0",
                len: 2,
            }))
        });
        assert_eq!(result, Err(FfsError::Overrun));
        assert!(stream.is_empty());
    }

    #[test]
    fn rewrite_in_place_failing_midway_drops_the_data() {
        let mut storage = *b"aabb!!cc";
        let mut stream = StreamBuffer::input(&mut storage);
        let result = stream.rewrite_data_in_place(|rest| {
            if rest[0] == b'!' {
                return Err(FfsError::Error);
            }
            Ok(Some(RewriteStep {
                consumed: 2,
                bytes: [rest[0], 0, 0, 0],
                len: 1,
            }))
        });
        assert_eq!(result, Err(FfsError::Error));
        assert_eq!(stream.data_size(), 0);
        assert_eq!(stream.read(1), Err(FfsError::Underrun));
    }

    #[test]
    fn rewrite_in_place_shrinks_data() {
        let mut storage = *b"aabbcc";
        let mut stream = StreamBuffer::input(&mut storage);
        stream
            .rewrite_data_in_place(|rest| {
                Ok(Some(RewriteStep {
                    consumed: 2,
                    bytes: [rest[0], 0, 0, 0],
                    len: 1,
                }))
            })
            .unwrap();
        assert_eq!(stream.data(), b"abc");
    }

    #[test]
    fn write_with_commits_reported_length() {
        let mut storage = [0u8; 4];
        let mut stream = StreamBuffer::output(&mut storage);
        let written = stream
            .write_with(|spare| {
                spare[..3].copy_from_slice(b"xyz");
                Ok(3)
            })
            .unwrap();
        assert_eq!(written, 3);
        assert_eq!(stream.data(), b"xyz");
    }
}
