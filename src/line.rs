//! Virtual serial line settings sent to the device during configuration.
//!
//! [`LineCoding`] is the 7 byte SET_LINE_CODING payload and
//! [`ControlLineState`] the SET_CONTROL_LINE_STATE value.  Both are plain
//! values, built once and handed to [`crate::Session::configure`].
use crate::constants::*;
use crate::Error;

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use std::fmt;
use std::str::FromStr;

/// The CDC-ACM class requests this crate issues
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlRequest {
    SetLineCoding,
    SetControlLineState,
}

impl ControlRequest {
    /// The bRequest value for this request
    pub fn code(&self) -> u8 {
        match self {
            ControlRequest::SetLineCoding => SET_LINE_CODING,
            ControlRequest::SetControlLineState => SET_CONTROL_LINE_STATE,
        }
    }
}

impl fmt::Display for ControlRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlRequest::SetLineCoding => write!(f, "SET_LINE_CODING"),
            ControlRequest::SetControlLineState => write!(f, "SET_CONTROL_LINE_STATE"),
        }
    }
}

/// Number of stop bits, encoded as bCharFormat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum StopBits {
    #[default]
    One = 0,
    OnePointFive = 1,
    Two = 2,
}

impl fmt::Display for StopBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopBits::One => write!(f, "1"),
            StopBits::OnePointFive => write!(f, "1.5"),
            StopBits::Two => write!(f, "2"),
        }
    }
}

/// Parity, encoded as bParityType
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Parity {
    #[default]
    None = 0,
    Odd = 1,
    Even = 2,
    Mark = 3,
    Space = 4,
}

impl Parity {
    fn from_letter(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'N' => Some(Parity::None),
            'O' => Some(Parity::Odd),
            'E' => Some(Parity::Even),
            'M' => Some(Parity::Mark),
            'S' => Some(Parity::Space),
            _ => None,
        }
    }

    fn letter(&self) -> char {
        match self {
            Parity::None => 'N',
            Parity::Odd => 'O',
            Parity::Even => 'E',
            Parity::Mark => 'M',
            Parity::Space => 'S',
        }
    }
}

/// Line coding: baud rate and character framing.
///
/// On the wire this is 7 bytes:
/// * `dwDTERate` - baud rate, 32 bit little endian
/// * `bCharFormat` - [`StopBits`]
/// * `bParityType` - [`Parity`]
/// * `bDataBits` - 5, 6, 7, 8 or 16
///
/// It can also be parsed from and displayed as `<baud>-<data bits><parity><stop bits>`,
/// for example `115200-8N1` or `9600-7E1.5`.
///
/// # Example
///
/// ```rust
/// use cdc_acm::LineCoding;
///
/// let coding: LineCoding = "115200-8N1".parse().unwrap();
/// assert_eq!(coding.to_bytes(), [0x00, 0xC2, 0x01, 0x00, 0x00, 0x00, 0x08]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineCoding {
    pub baud_rate: u32,
    pub stop_bits: StopBits,
    pub parity: Parity,
    pub data_bits: u8,
}

impl Default for LineCoding {
    fn default() -> Self {
        LineCoding {
            baud_rate: DEFAULT_BAUD_RATE,
            stop_bits: StopBits::default(),
            parity: Parity::default(),
            data_bits: DEFAULT_DATA_BITS,
        }
    }
}

impl LineCoding {
    /// Creates a new [`LineCoding`], validating the data bits
    ///
    /// # Returns
    /// * `Ok(LineCoding)` - if `data_bits` is 5, 6, 7, 8 or 16
    /// * `Err(Error::Args)` - otherwise, or if `baud_rate` is zero
    pub fn new(
        baud_rate: u32,
        data_bits: u8,
        parity: Parity,
        stop_bits: StopBits,
    ) -> Result<Self, Error> {
        if baud_rate == 0 {
            return Err(Error::Args {
                message: "Baud rate must be non-zero".into(),
            });
        }
        if !matches!(data_bits, 5..=8 | 16) {
            return Err(Error::Args {
                message: format!("Invalid data bits {data_bits}, must be 5, 6, 7, 8 or 16"),
            });
        }
        Ok(LineCoding {
            baud_rate,
            stop_bits,
            parity,
            data_bits,
        })
    }

    /// Encodes this line coding as the SET_LINE_CODING payload
    pub fn to_bytes(&self) -> [u8; LINE_CODING_SIZE] {
        let baud = self.baud_rate.to_le_bytes();
        [
            baud[0],
            baud[1],
            baud[2],
            baud[3],
            self.stop_bits as u8,
            self.parity as u8,
            self.data_bits,
        ]
    }
}

impl fmt::Display for LineCoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}{}{}",
            self.baud_rate,
            self.data_bits,
            self.parity.letter(),
            self.stop_bits
        )
    }
}

impl FromStr for LineCoding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        trace!("LineCoding::from_str {s}");
        let invalid = || Error::Args {
            message: format!("Invalid line coding {s:?}, expected e.g. 115200-8N1"),
        };

        let (baud, framing) = s.trim().split_once('-').ok_or_else(invalid)?;
        let baud_rate = baud.parse::<u32>().map_err(|_| invalid())?;

        let parity_pos = framing
            .find(|c: char| c.is_ascii_alphabetic())
            .ok_or_else(invalid)?;
        let data_bits = framing[..parity_pos]
            .parse::<u8>()
            .map_err(|_| invalid())?;
        let mut rest = framing[parity_pos..].chars();
        let parity = rest
            .next()
            .and_then(Parity::from_letter)
            .ok_or_else(invalid)?;
        let stop_bits = match rest.as_str() {
            "1" => StopBits::One,
            "1.5" => StopBits::OnePointFive,
            "2" => StopBits::Two,
            _ => return Err(invalid()),
        };

        Self::new(baud_rate, data_bits, parity, stop_bits)
    }
}

/// The DTR/RTS control line signals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlLineState {
    pub dtr: bool,
    pub rts: bool,
}

impl Default for ControlLineState {
    /// Both DTR and RTS asserted
    fn default() -> Self {
        ControlLineState {
            dtr: true,
            rts: true,
        }
    }
}

impl ControlLineState {
    /// The wValue for SET_CONTROL_LINE_STATE
    pub fn value(&self) -> u16 {
        let mut value = 0;
        if self.dtr {
            value |= ACM_CTRL_DTR;
        }
        if self.rts {
            value |= ACM_CTRL_RTS;
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_115200_8n1() {
        let coding = LineCoding::default();
        assert_eq!(
            coding.to_bytes(),
            [0x00, 0xC2, 0x01, 0x00, 0x00, 0x00, 0x08]
        );
        assert_eq!(coding.to_string(), "115200-8N1");
    }

    #[test]
    fn test_baud_is_little_endian() {
        let coding = LineCoding::new(9600, 8, Parity::None, StopBits::One).unwrap();
        assert_eq!(&coding.to_bytes()[..4], &[0x80, 0x25, 0x00, 0x00]);

        let coding = LineCoding::new(57600, 8, Parity::None, StopBits::One).unwrap();
        assert_eq!(&coding.to_bytes()[..4], &[0x00, 0xE1, 0x00, 0x00]);

        let coding = LineCoding::new(3_000_000, 8, Parity::None, StopBits::One).unwrap();
        assert_eq!(&coding.to_bytes()[..4], &[0xC0, 0xC6, 0x2D, 0x00]);
    }

    #[test]
    fn test_parse_framing() {
        let coding: LineCoding = "9600-7E2".parse().unwrap();
        assert_eq!(
            coding,
            LineCoding {
                baud_rate: 9600,
                stop_bits: StopBits::Two,
                parity: Parity::Even,
                data_bits: 7,
            }
        );
        assert_eq!(coding.to_bytes()[4..], [0x02, 0x02, 0x07]);

        let coding: LineCoding = "57600-8o1.5".parse().unwrap();
        assert_eq!(coding.parity, Parity::Odd);
        assert_eq!(coding.stop_bits, StopBits::OnePointFive);
        assert_eq!(coding.to_string(), "57600-8O1.5");
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        for bad in ["", "115200", "115200-8X1", "115200-9N1", "0-8N1", "abc-8N1", "9600-8N3"] {
            assert!(
                matches!(bad.parse::<LineCoding>(), Err(Error::Args { .. })),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_control_line_state() {
        assert_eq!(ControlLineState::default().value(), 0x03);
        let state = ControlLineState {
            dtr: true,
            rts: false,
        };
        assert_eq!(state.value(), ACM_CTRL_DTR);
        assert_eq!(
            ControlLineState {
                dtr: false,
                rts: false
            }
            .value(),
            0
        );
    }
}
