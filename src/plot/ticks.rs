//! Axis tick label formatting.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum FormatError {
    #[error("unsupported tick format {0:?}: expected a printf-style %e conversion such as \"%1.2e\"")]
    Unsupported(String),
}

pub trait TickFormatter {
    fn format(&self, value: f64) -> String;
}

/// Mathtext scientific notation: `$1.23{\times}10^{3}$`.
///
/// The value is rendered with a printf-style `%e` format, then the mantissa
/// loses trailing zeros and a dangling decimal point, and the exponent loses
/// its '+' sign and leading zeros. A zero exponent leaves only the mantissa.
#[derive(Debug, Clone, PartialEq)]
pub struct MathTextSciFormatter {
    fmt: String,
    spec: SciSpec,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct SciSpec {
    left_align: bool,
    plus_sign: bool,
    space_sign: bool,
    zero_pad: bool,
    width: usize,
    precision: usize,
}

impl MathTextSciFormatter {
    pub const DEFAULT_FORMAT: &'static str = "%1.2e";

    pub fn new(fmt: &str) -> Result<Self, FormatError> {
        Ok(MathTextSciFormatter {
            fmt: fmt.to_string(),
            spec: parse_spec(fmt)?,
        })
    }

    pub fn fmt(&self) -> &str {
        &self.fmt
    }

    /// printf `%e` rendering, e.g. `1.23e+03`
    fn printf(&self, value: f64) -> String {
        let spec = self.spec;
        let body = format!("{:.*e}", spec.precision, value.abs());
        let body = match body.split_once('e') {
            Some((mantissa, exp)) => {
                let exp: i32 = exp.parse().unwrap_or(0);
                let sign = if exp < 0 { '-' } else { '+' };
                format!("{mantissa}e{sign}{:02}", exp.unsigned_abs())
            }
            None => body.to_lowercase(),
        };

        let sign = if value.is_sign_negative() && !value.is_nan() {
            "-"
        } else if spec.plus_sign {
            "+"
        } else if spec.space_sign {
            " "
        } else {
            ""
        };

        let len = sign.len() + body.len();
        if len >= spec.width {
            format!("{sign}{body}")
        } else if spec.left_align {
            format!("{sign}{body}{}", " ".repeat(spec.width - len))
        } else if spec.zero_pad && value.is_finite() {
            format!("{sign}{}{body}", "0".repeat(spec.width - len))
        } else {
            format!("{}{sign}{body}", " ".repeat(spec.width - len))
        }
    }
}

impl Default for MathTextSciFormatter {
    fn default() -> Self {
        MathTextSciFormatter {
            fmt: Self::DEFAULT_FORMAT.to_string(),
            spec: SciSpec {
                left_align: false,
                plus_sign: false,
                space_sign: false,
                zero_pad: false,
                width: 1,
                precision: 2,
            },
        }
    }
}

impl TickFormatter for MathTextSciFormatter {
    fn format(&self, value: f64) -> String {
        let rendered = self.printf(value);
        let (mantissa, exponent) = match rendered.split_once('e') {
            Some((m, e)) => (m, Some(e)),
            None => (rendered.as_str(), None),
        };

        let significand = if mantissa.contains('.') {
            mantissa.trim_end_matches('0').trim_end_matches('.')
        } else {
            mantissa
        };

        let exponent = exponent
            .and_then(|e| {
                let mut chars = e.chars();
                let sign = chars.next()?.to_string().replace('+', "");
                let digits = chars.as_str().trim_start_matches('0');
                (!digits.is_empty()).then(|| format!("10^{{{sign}{digits}}}"))
            })
            .unwrap_or_default();

        let body = if !significand.is_empty() && !exponent.is_empty() {
            format!("{significand}{{\\times}}{exponent}")
        } else {
            format!("{significand}{exponent}")
        };
        format!("${body}$")
    }
}

fn parse_spec(fmt: &str) -> Result<SciSpec, FormatError> {
    let unsupported = || FormatError::Unsupported(fmt.to_string());
    let rest = fmt.strip_prefix('%').ok_or_else(unsupported)?;
    let conversion = rest.strip_suffix('e').ok_or_else(unsupported)?;

    let mut spec = SciSpec {
        left_align: false,
        plus_sign: false,
        space_sign: false,
        zero_pad: false,
        width: 0,
        precision: 6,
    };

    let flags_end = conversion
        .find(|c: char| !matches!(c, '-' | '+' | ' ' | '0' | '#'))
        .unwrap_or(conversion.len());
    for c in conversion[..flags_end].chars() {
        match c {
            '-' => spec.left_align = true,
            '+' => spec.plus_sign = true,
            ' ' => spec.space_sign = true,
            '0' => spec.zero_pad = true,
            _ => {}
        }
    }

    let (width, precision) = match conversion[flags_end..].split_once('.') {
        Some((w, p)) => (w, Some(p)),
        None => (&conversion[flags_end..], None),
    };
    if !width.is_empty() {
        spec.width = width.parse().map_err(|_| unsupported())?;
    }
    if let Some(p) = precision {
        spec.precision = if p.is_empty() {
            0
        } else {
            p.parse().map_err(|_| unsupported())?
        };
    }
    Ok(spec)
}

/// Fixed or scientific notation depending on magnitude
#[derive(Debug, Clone, Copy, Default)]
pub struct DecimalFormatter;

impl TickFormatter for DecimalFormatter {
    fn format(&self, value: f64) -> String {
        if value.abs() < 0.001 && value != 0.0 {
            format!("{:.2e}", value)
        } else if value.abs() >= 1000.0 {
            format!("{:.2e}", value)
        } else if value.abs() >= 1.0 {
            format!("{:.2}", value)
        } else {
            format!("{:.4}", value)
        }
    }
}
