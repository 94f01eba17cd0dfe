use std::fmt;

/// Sense key, additional sense code, additional sense code qualifier.
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub struct SenseTriple(pub u8, pub u8, pub u8);

impl SenseTriple {
    /// Pulls the key/ASC/ASCQ out of fixed (0x70/0x71) or descriptor
    /// (0x72/0x73) format sense data. Returns `None` for anything too short
    /// or with an unknown response code.
    pub fn parse(sense: &[u8]) -> Option<Self> {
        let response_code = sense.first()? & 0x7f;
        match response_code {
            0x70 | 0x71 => {
                if sense.len() < 14 {
                    return None;
                }
                Some(Self(sense[2] & 0xf, sense[12], sense[13]))
            }
            0x72 | 0x73 => {
                if sense.len() < 4 {
                    return None;
                }
                Some(Self(sense[1] & 0xf, sense[2], sense[3]))
            }
            _ => None,
        }
    }

    pub fn key_name(self) -> &'static str {
        SENSE_KEY_NAMES
            .get(usize::from(self.0))
            .copied()
            .unwrap_or("Reserved")
    }
}

impl fmt::Display for SenseTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (asc {:#04x}, ascq {:#04x})",
            self.key_name(),
            self.1,
            self.2
        )
    }
}

const SENSE_KEY_NAMES: [&str; 16] = [
    "No Sense",
    "Recovered Error",
    "Not Ready",
    "Medium Error",
    "Hardware Error",
    "Illegal Request",
    "Unit Attention",
    "Data Protect",
    "Blank Check",
    "Vendor Specific",
    "Copy Aborted",
    "Aborted Command",
    "Reserved",
    "Volume Overflow",
    "Miscompare",
    "Completed",
];

pub const ILLEGAL_REQUEST: u8 = 0x5;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fixed() {
        let sense = [
            0x70, // response code (fixed, current); valid bit (0)
            0x0,  // reserved
            0x5,  // sk
            0x0, 0x0, 0x0, 0x0, // information
            0xa, // add'l sense length
            0x0, 0x0, 0x0, 0x0,  // cmd-specific information
            0x24, // asc
            0x0,  // ascq
            0x0,  // field-replacable unit code
            0x0, 0x0, 0x0, // sense-key-specific information
        ];
        let triple = SenseTriple::parse(&sense).unwrap();
        assert_eq!(triple, SenseTriple(ILLEGAL_REQUEST, 0x24, 0));
        assert_eq!(
            triple.to_string(),
            "Illegal Request (asc 0x24, ascq 0x00)"
        );
    }

    #[test]
    fn test_parse_descriptor() {
        let sense = [0x72, 0x3, 0x11, 0x0, 0, 0, 0, 0];
        assert_eq!(SenseTriple::parse(&sense), Some(SenseTriple(0x3, 0x11, 0)));
    }

    #[test]
    fn test_parse_garbage() {
        assert_eq!(SenseTriple::parse(&[]), None);
        assert_eq!(SenseTriple::parse(&[0; 32]), None);
        assert_eq!(SenseTriple::parse(&[0x70, 0, 5]), None);
    }
}
