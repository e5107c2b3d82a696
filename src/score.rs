use crate::error::{Error, Result};

/// Values that can be read as a score.
///
/// Numbers convert directly; text is parsed, so `"2.5"` and `"-inf"` are
/// accepted. NaN is never a valid score. `-0.0` becomes `0.0`.
///
/// # Examples
///
/// ```
/// use sorted_set_counter::IntoScore;
///
/// assert_eq!(3.into_score()?, 3.0);
/// assert_eq!(" 2.5 ".into_score()?, 2.5);
/// assert!("!".into_score().is_err());
/// assert!(f64::NAN.into_score().is_err());
/// # Ok::<(), sorted_set_counter::Error>(())
/// ```
pub trait IntoScore {
    /// # Errors
    ///
    /// Returns [`Error::TypeConversion`] if the value is not a real number.
    fn into_score(self) -> Result<f64>;
}

fn checked(value: f64) -> Result<f64> {
    if value.is_nan() {
        return Err(Error::TypeConversion {
            value: value.to_string(),
        });
    }
    Ok(value + 0.0)
}

impl IntoScore for f64 {
    fn into_score(self) -> Result<f64> {
        checked(self)
    }
}

impl IntoScore for f32 {
    fn into_score(self) -> Result<f64> {
        checked(f64::from(self))
    }
}

macro_rules! score_from_int {
    ($($int:ty),*) => {
        $(
            impl IntoScore for $int {
                fn into_score(self) -> Result<f64> {
                    Ok(f64::from(self))
                }
            }
        )*
    };
}

score_from_int!(i8, i16, i32, u8, u16, u32);

macro_rules! score_from_wide_int {
    ($($int:ty),*) => {
        $(
            impl IntoScore for $int {
                // Scores are doubles; wide integers round to the nearest one.
                #[allow(clippy::cast_precision_loss)]
                fn into_score(self) -> Result<f64> {
                    Ok(self as f64)
                }
            }
        )*
    };
}

score_from_wide_int!(i64, u64, isize, usize);

impl IntoScore for &str {
    fn into_score(self) -> Result<f64> {
        let parsed = self.trim().parse::<f64>().map_err(|_| Error::TypeConversion {
            value: self.to_owned(),
        })?;
        checked(parsed)
    }
}

impl IntoScore for String {
    fn into_score(self) -> Result<f64> {
        self.as_str().into_score()
    }
}

impl IntoScore for &String {
    fn into_score(self) -> Result<f64> {
        self.as_str().into_score()
    }
}
