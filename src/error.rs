use core::fmt;

/// Result codes surfaced by every stream, codec, message and session call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FfsError {
    /// Tried to read past the available data.
    Underrun,
    /// Tried to write past the capacity, or a paginated add did not fit.
    Overrun,
    Timeout,
    /// Feature or field intentionally unhandled.
    NotImplemented,
    /// Protocol rejection, malformed JSON, type mismatch, unknown enum string.
    Error,
}

pub type FfsResult<T> = Result<T, FfsError>;

impl FfsError {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Underrun => "underrun",
            Self::Overrun => "overrun",
            Self::Timeout => "timeout",
            Self::NotImplemented => "not_implemented",
            Self::Error => "error",
        }
    }

    /// Buffer faults are recovered by pagination or a larger buffer, never by
    /// retrying the same call.
    pub const fn is_buffer_fault(self) -> bool {
        matches!(self, Self::Underrun | Self::Overrun)
    }
}

impl fmt::Display for FfsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<base64::DecodeSliceError> for FfsError {
    fn from(value: base64::DecodeSliceError) -> Self {
        match value {
            base64::DecodeSliceError::OutputSliceTooSmall => Self::Overrun,
            base64::DecodeSliceError::DecodeError(_) => Self::Error,
        }
    }
}

impl From<base64::EncodeSliceError> for FfsError {
    fn from(_: base64::EncodeSliceError) -> Self {
        Self::Overrun
    }
}

impl From<hex::FromHexError> for FfsError {
    fn from(value: hex::FromHexError) -> Self {
        match value {
            hex::FromHexError::InvalidStringLength => Self::Overrun,
            hex::FromHexError::InvalidHexCharacter { .. } | hex::FromHexError::OddLength => {
                Self::Error
            }
        }
    }
}

/// Pushes `value` into a fixed-capacity string, mapping a full buffer to
/// [`FfsError::Overrun`].
pub(crate) fn push_str<const N: usize>(
    destination: &mut heapless::String<N>,
    value: &str,
) -> FfsResult<()> {
    destination.push_str(value).map_err(|_| FfsError::Overrun)
}

pub(crate) fn copy_bytes<const N: usize>(value: &[u8]) -> FfsResult<heapless::Vec<u8, N>> {
    heapless::Vec::from_slice(value).map_err(|_| FfsError::Overrun)
}

pub(crate) fn copy_str<const N: usize>(value: &str) -> FfsResult<heapless::String<N>> {
    let mut out = heapless::String::new();
    push_str(&mut out, value)?;
    Ok(out)
}
