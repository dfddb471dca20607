//! Serialize packages back into the config dialect.

use crate::model::{Package, Value};
use std::borrow::Cow;
use std::io::{self, Write};

/// Escape a value for use inside single quotes: `'` becomes `'\''`.
pub fn escape(value: &str) -> Cow<'_, str> {
    if value.contains('\'') {
        Cow::Owned(value.replace('\'', r"'\''"))
    } else {
        Cow::Borrowed(value)
    }
}

/// Escape and wrap in single quotes.
pub fn quote(value: &str) -> String {
    format!("'{}'", escape(value))
}

/// Output options for [`write_package`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ExportOptions {
    /// Emit a leading `package '<name>'` line.
    pub header: bool,
    /// Write generated names of anonymous sections too.
    pub names: bool,
}

/// Write one package. Sections and options keep declaration order; the
/// output always ends with an empty line.
pub fn write_package<W: Write>(
    writer: &mut W,
    package: &Package,
    options: ExportOptions,
) -> io::Result<()> {
    if options.header {
        writeln!(writer, "package {}", quote(package.name()))?;
    }

    for section in package.sections() {
        write!(writer, "\nconfig {}", quote(section.section_type()))?;
        if !section.is_anonymous() || options.names {
            write!(writer, " {}", quote(section.name()))?;
        }
        writeln!(writer)?;

        for option in section.options() {
            match option.value() {
                Value::Scalar(value) => {
                    writeln!(writer, "\toption {} {}", quote(option.name()), quote(value))?;
                }
                Value::List(items) => {
                    for item in items {
                        writeln!(writer, "\tlist {} {}", quote(option.name()), quote(item))?;
                    }
                }
            }
        }
    }
    writeln!(writer)
}

/// Render a package to a string.
pub fn to_string(package: &Package, options: ExportOptions) -> String {
    let mut out = Vec::new();
    // Writing into a Vec cannot fail.
    let _ = write_package(&mut out, package, options);
    String::from_utf8_lossy(&out).into_owned()
}
