//! Names for anonymous sections.
//!
//! An anonymous section is named `cfg` + a two digit hex creation ordinal +
//! four hex digits of a djb2 hash over its type and options. Two independent
//! parses of unchanged content produce the same names. Editing an anonymous
//! section or reordering same-type sections breaks stored references to it;
//! history lines aimed at the old name are then dropped on replay.

use crate::model::section::{Section, Value};

const DJB_SEED: u32 = 5381;

fn djb_hash(mut hash: u32, text: &str) -> u32 {
    for byte in text.bytes() {
        hash = (hash << 5).wrapping_add(hash).wrapping_add(u32::from(byte));
    }
    hash & 0x7FFF_FFFF
}

/// Content hash of a section: type, then every option name and value.
pub fn section_hash(section: &Section) -> u32 {
    let mut hash = djb_hash(DJB_SEED, section.section_type());
    for option in section.options() {
        hash = djb_hash(hash, option.name());
        match option.value() {
            Value::Scalar(value) => hash = djb_hash(hash, value),
            Value::List(items) => {
                for item in items {
                    hash = djb_hash(hash, item);
                }
            }
        }
    }
    hash
}

pub fn anonymous_name(ordinal: u32, hash: u32) -> String {
    format!("cfg{:02x}{:04x}", ordinal, hash % (1 << 16))
}
