use core::cmp::Ordering;
use core::fmt;
use core::hash::{Hash, Hasher};

use crate::error::{Error, Result};

const TAG_BYTES: u8 = b'b';
const TAG_FLOAT: u8 = b'f';
const TAG_INT: u8 = b'i';
const TAG_TEXT: u8 = b's';

const SIGN_BIT: u64 = 1 << 63;

/// A strictly typed member of a sorted set.
///
/// Members of different variants never compare equal, so the integer `1` and
/// the float `1.0` are distinct members. Floats compare by bit pattern.
///
/// Members are stored as a tag byte followed by an order-preserving payload,
/// and [`Ord`] agrees with the byte order of that encoding: variants sort
/// `Bytes < Float < Int < Text`, and values sort naturally within a variant.
///
/// # Examples
///
/// ```
/// use sorted_set_counter::Member;
///
/// assert_ne!(Member::from(1), Member::from(1.0));
///
/// let member = Member::from("alice");
/// assert_eq!(Member::decode(&member.encode())?, member);
/// # Ok::<(), sorted_set_counter::Error>(())
/// ```
#[derive(Clone, Debug)]
pub enum Member {
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl Member {
    fn tag(&self) -> u8 {
        match self {
            Member::Int(_) => TAG_INT,
            Member::Float(_) => TAG_FLOAT,
            Member::Text(_) => TAG_TEXT,
            Member::Bytes(_) => TAG_BYTES,
        }
    }

    /// The canonical, type-preserving encoding handed to the store.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(9);
        out.push(self.tag());
        match self {
            Member::Int(value) => out.extend_from_slice(&encode_int(*value)),
            Member::Float(value) => out.extend_from_slice(&encode_float(*value)),
            Member::Text(value) => out.extend_from_slice(value.as_bytes()),
            Member::Bytes(value) => out.extend_from_slice(value),
        }
        out
    }

    /// Reverses [`Member::encode`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] for an unknown tag, a numeric payload that is
    /// not exactly eight bytes, or text that is not UTF-8.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let (&tag, payload) = bytes.split_first().ok_or(Error::Decode)?;
        match tag {
            TAG_INT => Ok(Member::Int(decode_int(fixed(payload)?))),
            TAG_FLOAT => Ok(Member::Float(decode_float(fixed(payload)?))),
            TAG_TEXT => String::from_utf8(payload.to_vec()).map(Member::Text).map_err(|_| Error::Decode),
            TAG_BYTES => Ok(Member::Bytes(payload.to_vec())),
            _ => Err(Error::Decode),
        }
    }
}

fn fixed(payload: &[u8]) -> Result<[u8; 8]> {
    payload.try_into().map_err(|_| Error::Decode)
}

// Flipping the sign bit makes two's complement sort as unsigned big-endian.
fn encode_int(value: i64) -> [u8; 8] {
    (u64::from_ne_bytes(value.to_ne_bytes()) ^ SIGN_BIT).to_be_bytes()
}

fn decode_int(bytes: [u8; 8]) -> i64 {
    i64::from_ne_bytes((u64::from_be_bytes(bytes) ^ SIGN_BIT).to_ne_bytes())
}

// Same transform as `f64::total_cmp`: negatives get every bit flipped,
// positives only the sign bit.
fn encode_float(value: f64) -> [u8; 8] {
    let bits = value.to_bits();
    let ordered = if bits & SIGN_BIT == 0 { bits ^ SIGN_BIT } else { !bits };
    ordered.to_be_bytes()
}

fn decode_float(bytes: [u8; 8]) -> f64 {
    let ordered = u64::from_be_bytes(bytes);
    let bits = if ordered & SIGN_BIT == 0 { !ordered } else { ordered ^ SIGN_BIT };
    f64::from_bits(bits)
}

impl PartialEq for Member {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Member::Int(a), Member::Int(b)) => a == b,
            (Member::Float(a), Member::Float(b)) => a.to_bits() == b.to_bits(),
            (Member::Text(a), Member::Text(b)) => a == b,
            (Member::Bytes(a), Member::Bytes(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Member {}

impl Hash for Member {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.tag().hash(state);
        match self {
            Member::Int(value) => value.hash(state),
            Member::Float(value) => value.to_bits().hash(state),
            Member::Text(value) => value.hash(state),
            Member::Bytes(value) => value.hash(state),
        }
    }
}

impl Ord for Member {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Member::Int(a), Member::Int(b)) => a.cmp(b),
            (Member::Float(a), Member::Float(b)) => a.total_cmp(b),
            (Member::Text(a), Member::Text(b)) => a.as_bytes().cmp(b.as_bytes()),
            (Member::Bytes(a), Member::Bytes(b)) => a.cmp(b),
            _ => self.tag().cmp(&other.tag()),
        }
    }
}

impl PartialOrd for Member {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Renders members the way they would be written as literals: text quoted,
/// floats always with a fractional part, bytes as a `b"..."` string.
impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Member::Int(value) => write!(f, "{value}"),
            Member::Float(value) => write!(f, "{value:?}"),
            Member::Text(value) => write!(f, "'{}'", value.escape_debug()),
            Member::Bytes(value) => write!(f, "b\"{}\"", value.escape_ascii()),
        }
    }
}

macro_rules! member_from_int {
    ($($int:ty),*) => {
        $(
            impl From<$int> for Member {
                fn from(value: $int) -> Self {
                    Member::Int(i64::from(value))
                }
            }
        )*
    };
}

member_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<f32> for Member {
    fn from(value: f32) -> Self {
        Member::Float(f64::from(value))
    }
}

impl From<f64> for Member {
    fn from(value: f64) -> Self {
        Member::Float(value)
    }
}

impl From<&str> for Member {
    fn from(value: &str) -> Self {
        Member::Text(value.to_owned())
    }
}

impl From<String> for Member {
    fn from(value: String) -> Self {
        Member::Text(value)
    }
}

impl From<&[u8]> for Member {
    fn from(value: &[u8]) -> Self {
        Member::Bytes(value.to_vec())
    }
}

impl From<Vec<u8>> for Member {
    fn from(value: Vec<u8>) -> Self {
        Member::Bytes(value)
    }
}

impl From<&Member> for Member {
    fn from(value: &Member) -> Self {
        value.clone()
    }
}
