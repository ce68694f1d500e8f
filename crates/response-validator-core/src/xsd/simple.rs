//! Simple types: built-in lexical spaces, derivation and facets.

use std::cmp::Ordering;
use std::sync::{Arc, OnceLock};

use regex::{Captures, Regex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WhiteSpace {
    Preserve,
    Replace,
    Collapse,
}

impl WhiteSpace {
    pub(crate) fn parse(value: &str) -> Option<Self> {
        match value {
            "preserve" => Some(WhiteSpace::Preserve),
            "replace" => Some(WhiteSpace::Replace),
            "collapse" => Some(WhiteSpace::Collapse),
            _ => None,
        }
    }

    fn apply(self, value: &str) -> String {
        match self {
            WhiteSpace::Preserve => value.to_owned(),
            WhiteSpace::Replace => value
                .chars()
                .map(|c| if matches!(c, '\t' | '\n' | '\r') { ' ' } else { c })
                .collect(),
            WhiteSpace::Collapse => value
                .split([' ', '\t', '\n', '\r'])
                .filter(|part| !part.is_empty())
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

macro_rules! builtins {
    ($($variant:ident => $local:literal),+ $(,)?) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub(crate) enum Builtin {
            $($variant),+
        }

        impl Builtin {
            pub(crate) const ALL: &'static [Builtin] = &[$(Builtin::$variant),+];

            pub(crate) fn local_name(self) -> &'static str {
                match self {
                    $(Builtin::$variant => $local),+
                }
            }
        }
    };
}

builtins! {
    AnySimpleType => "anySimpleType",
    String => "string",
    NormalizedString => "normalizedString",
    Token => "token",
    Language => "language",
    Name => "Name",
    NCName => "NCName",
    Id => "ID",
    IdRef => "IDREF",
    NmToken => "NMTOKEN",
    QName => "QName",
    AnyUri => "anyURI",
    Boolean => "boolean",
    Decimal => "decimal",
    Float => "float",
    Double => "double",
    Integer => "integer",
    Long => "long",
    Int => "int",
    Short => "short",
    Byte => "byte",
    NonNegativeInteger => "nonNegativeInteger",
    PositiveInteger => "positiveInteger",
    NonPositiveInteger => "nonPositiveInteger",
    NegativeInteger => "negativeInteger",
    UnsignedLong => "unsignedLong",
    UnsignedInt => "unsignedInt",
    UnsignedShort => "unsignedShort",
    UnsignedByte => "unsignedByte",
    Date => "date",
    DateTime => "dateTime",
    Time => "time",
    Duration => "duration",
    GYear => "gYear",
    Base64Binary => "base64Binary",
    HexBinary => "hexBinary",
}

/// A built-in lexical pattern. A pattern that failed to compile matches nothing.
#[derive(Debug, Clone, Copy)]
struct Lexical(Option<&'static Regex>);

impl Lexical {
    fn is_match(self, value: &str) -> bool {
        self.0.is_some_and(|re| re.is_match(value))
    }

    fn captures(self, value: &str) -> Option<Captures<'_>> {
        self.0?.captures(value)
    }
}

fn cached(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Lexical {
    Lexical(cell.get_or_init(|| Regex::new(pattern).ok()).as_ref())
}

macro_rules! lexical {
    ($name:ident, $pattern:literal) => {
        fn $name() -> Lexical {
            static RE: OnceLock<Option<Regex>> = OnceLock::new();
            cached(&RE, $pattern)
        }
    };
}

lexical!(integer_re, r"^[+-]?[0-9]+$");
lexical!(decimal_re, r"^[+-]?([0-9]+(\.[0-9]*)?|\.[0-9]+)$");
lexical!(float_re, r"^([+-]?([0-9]+(\.[0-9]*)?|\.[0-9]+)([eE][+-]?[0-9]+)?|-?INF|NaN)$");
lexical!(name_re, r"^[\p{L}_:][\p{L}\p{N}\p{M}._:\-\u{B7}]*$");
lexical!(ncname_re, r"^[\p{L}_][\p{L}\p{N}\p{M}._\-\u{B7}]*$");
lexical!(nmtoken_re, r"^[\p{L}\p{N}\p{M}._:\-\u{B7}]+$");
lexical!(language_re, r"^[a-zA-Z]{1,8}(-[a-zA-Z0-9]{1,8})*$");
lexical!(timezone_re, r"^(Z|[+-](\d{2}):(\d{2}))?$");
lexical!(date_re, r"^(-?\d{4,})-(\d{2})-(\d{2})(.*)$");
lexical!(time_re, r"^(\d{2}):(\d{2}):(\d{2})(\.\d+)?(.*)$");
lexical!(gyear_re, r"^(-?\d{4,})(.*)$");
lexical!(
    duration_re,
    r"^-?P(\d+Y)?(\d+M)?(\d+D)?(T(\d+H)?(\d+M)?(\d+(\.\d+)?S)?)?$"
);

impl Builtin {
    pub(crate) fn from_local(local: &str) -> Option<Builtin> {
        Builtin::ALL
            .iter()
            .copied()
            .find(|builtin| builtin.local_name() == local)
    }

    /// Type this built-in is derived from by restriction.
    pub(crate) fn base(self) -> Builtin {
        match self {
            Builtin::NormalizedString => Builtin::String,
            Builtin::Token => Builtin::NormalizedString,
            Builtin::Language | Builtin::Name | Builtin::NmToken => Builtin::Token,
            Builtin::NCName => Builtin::Name,
            Builtin::Id | Builtin::IdRef => Builtin::NCName,
            Builtin::Integer => Builtin::Decimal,
            Builtin::NonPositiveInteger | Builtin::Long | Builtin::NonNegativeInteger => {
                Builtin::Integer
            }
            Builtin::NegativeInteger => Builtin::NonPositiveInteger,
            Builtin::Int => Builtin::Long,
            Builtin::Short => Builtin::Int,
            Builtin::Byte => Builtin::Short,
            Builtin::UnsignedLong | Builtin::PositiveInteger => Builtin::NonNegativeInteger,
            Builtin::UnsignedInt => Builtin::UnsignedLong,
            Builtin::UnsignedShort => Builtin::UnsignedInt,
            Builtin::UnsignedByte => Builtin::UnsignedShort,
            _ => Builtin::AnySimpleType,
        }
    }

    fn whitespace(self) -> WhiteSpace {
        match self {
            Builtin::String | Builtin::AnySimpleType => WhiteSpace::Preserve,
            Builtin::NormalizedString => WhiteSpace::Replace,
            _ => WhiteSpace::Collapse,
        }
    }

    pub(crate) fn is_numeric(self) -> bool {
        matches!(
            self,
            Builtin::Decimal
                | Builtin::Float
                | Builtin::Double
                | Builtin::Integer
                | Builtin::Long
                | Builtin::Int
                | Builtin::Short
                | Builtin::Byte
                | Builtin::NonNegativeInteger
                | Builtin::PositiveInteger
                | Builtin::NonPositiveInteger
                | Builtin::NegativeInteger
                | Builtin::UnsignedLong
                | Builtin::UnsignedInt
                | Builtin::UnsignedShort
                | Builtin::UnsignedByte
        )
    }

    fn integer_range(self) -> Option<(i128, i128)> {
        let range = match self {
            Builtin::Long => (i64::MIN as i128, i64::MAX as i128),
            Builtin::Int => (i32::MIN as i128, i32::MAX as i128),
            Builtin::Short => (i16::MIN as i128, i16::MAX as i128),
            Builtin::Byte => (i8::MIN as i128, i8::MAX as i128),
            Builtin::UnsignedLong => (0, u64::MAX as i128),
            Builtin::UnsignedInt => (0, u32::MAX as i128),
            Builtin::UnsignedShort => (0, u16::MAX as i128),
            Builtin::UnsignedByte => (0, u8::MAX as i128),
            _ => return None,
        };
        Some(range)
    }

    /// Check `value` (already whitespace-normalized) against the lexical space.
    fn check_lexical(self, value: &str) -> Result<(), String> {
        let ok = match self {
            Builtin::AnySimpleType
            | Builtin::String
            | Builtin::NormalizedString
            | Builtin::Token => true,
            Builtin::Language => language_re().is_match(value),
            Builtin::Name => name_re().is_match(value),
            Builtin::NCName | Builtin::Id | Builtin::IdRef => ncname_re().is_match(value),
            Builtin::NmToken => nmtoken_re().is_match(value),
            Builtin::QName => match value.split_once(':') {
                Some((prefix, local)) => {
                    ncname_re().is_match(prefix) && ncname_re().is_match(local)
                }
                None => ncname_re().is_match(value),
            },
            Builtin::AnyUri => is_any_uri(value),
            Builtin::Boolean => matches!(value, "true" | "false" | "1" | "0"),
            Builtin::Decimal => decimal_re().is_match(value),
            Builtin::Float | Builtin::Double => float_re().is_match(value),
            Builtin::Integer
            | Builtin::Long
            | Builtin::Int
            | Builtin::Short
            | Builtin::Byte
            | Builtin::NonNegativeInteger
            | Builtin::PositiveInteger
            | Builtin::NonPositiveInteger
            | Builtin::NegativeInteger
            | Builtin::UnsignedLong
            | Builtin::UnsignedInt
            | Builtin::UnsignedShort
            | Builtin::UnsignedByte => return self.check_integer(value),
            Builtin::Date => is_date(value),
            Builtin::Time => is_time(value),
            Builtin::DateTime => match value.split_once('T') {
                Some((date, time)) => is_date(date) && is_time(time),
                None => false,
            },
            Builtin::Duration => {
                duration_re().is_match(value) && !value.ends_with('P') && !value.ends_with('T')
            }
            Builtin::GYear => gyear_re()
                .captures(value)
                .is_some_and(|caps| parse_year(&caps[1]).is_some() && is_timezone(&caps[2])),
            Builtin::Base64Binary => is_base64(value),
            Builtin::HexBinary => {
                value.len() % 2 == 0 && value.bytes().all(|b| b.is_ascii_hexdigit())
            }
        };

        if ok {
            Ok(())
        } else {
            Err(format!("'{value}' is not a valid {}", self.local_name()))
        }
    }

    fn check_integer(self, value: &str) -> Result<(), String> {
        let invalid = || format!("'{value}' is not a valid {}", self.local_name());
        if !integer_re().is_match(value) {
            return Err(invalid());
        }

        let negative = value.starts_with('-');
        let zero = value.trim_start_matches(['+', '-']).bytes().all(|b| b == b'0');
        let sign_ok = match self {
            Builtin::NonNegativeInteger => !negative || zero,
            Builtin::PositiveInteger => !negative && !zero,
            Builtin::NonPositiveInteger => negative || zero,
            Builtin::NegativeInteger => negative && !zero,
            _ => true,
        };
        if !sign_ok {
            return Err(invalid());
        }

        if let Some((min, max)) = self.integer_range() {
            let in_range = value
                .parse::<i128>()
                .is_ok_and(|n| (min..=max).contains(&n));
            if !in_range {
                return Err(format!(
                    "'{value}' is out of range for {}",
                    self.local_name()
                ));
            }
        }
        Ok(())
    }

    /// Length unit for `length`/`minLength`/`maxLength`.
    fn length_of(self, value: &str) -> usize {
        match self {
            Builtin::HexBinary => value.len() / 2,
            Builtin::Base64Binary => {
                let chars: Vec<u8> = value.bytes().filter(|b| *b != b' ').collect();
                let padding = chars.iter().rev().take_while(|&&b| b == b'=').count();
                (chars.len() / 4 * 3).saturating_sub(padding.min(2))
            }
            _ => value.chars().count(),
        }
    }
}

/// Year of a date-like value. Year zero and leading zeros beyond four
/// digits are not in the lexical space.
fn parse_year(raw: &str) -> Option<i128> {
    let digits = raw.trim_start_matches('-');
    if digits.len() > 4 && digits.starts_with('0') {
        return None;
    }
    let year: i128 = raw.parse().ok()?;
    (year != 0).then_some(year)
}

fn days_in_month(year: i128, month: u32) -> u32 {
    // Negative years count 1 BCE as -0001, so shift onto the proleptic calendar.
    let year = if year < 0 { year + 1 } else { year };
    let leap = year % 4 == 0 && (year % 100 != 0 || year % 400 == 0);
    match month {
        2 if leap => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

fn is_date(value: &str) -> bool {
    let Some(caps) = date_re().captures(value) else {
        return false;
    };
    let Some(year) = parse_year(&caps[1]) else {
        return false;
    };
    let month: u32 = caps[2].parse().unwrap_or(0);
    let day: u32 = caps[3].parse().unwrap_or(0);
    (1..=12).contains(&month)
        && (1..=days_in_month(year, month)).contains(&day)
        && is_timezone(&caps[4])
}

fn is_time(value: &str) -> bool {
    let Some(caps) = time_re().captures(value) else {
        return false;
    };
    let hour: u32 = caps[1].parse().unwrap_or(99);
    let minute: u32 = caps[2].parse().unwrap_or(99);
    let second: u32 = caps[3].parse().unwrap_or(99);
    let midnight = hour == 24 && minute == 0 && second == 0;
    (hour < 24 || midnight) && minute < 60 && second < 60 && is_timezone(&caps[5])
}

fn is_timezone(value: &str) -> bool {
    let Some(caps) = timezone_re().captures(value) else {
        return false;
    };
    match (caps.get(2), caps.get(3)) {
        (Some(hours), Some(minutes)) => {
            let hours: u32 = hours.as_str().parse().unwrap_or(99);
            let minutes: u32 = minutes.as_str().parse().unwrap_or(99);
            hours <= 14 && minutes < 60
        }
        _ => true,
    }
}

fn is_base64(value: &str) -> bool {
    let chars: Vec<u8> = value.bytes().filter(|b| *b != b' ').collect();
    if chars.len() % 4 != 0 {
        return false;
    }
    let padding = chars.iter().rev().take_while(|&&b| b == b'=').count();
    padding <= 2
        && chars[..chars.len() - padding]
            .iter()
            .all(|b| b.is_ascii_alphanumeric() || *b == b'+' || *b == b'/')
}

fn is_any_uri(value: &str) -> bool {
    if url::Url::parse(value).is_ok() {
        return true;
    }
    // Relative references resolve against any absolute base.
    url::Url::parse("http://relative.invalid/")
        .and_then(|base| base.join(value))
        .is_ok()
}

/// Exact decimal: sign plus digit strings without leading (integer part)
/// or trailing (fraction part) zeros. Zero is never negative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DecimalValue {
    negative: bool,
    int: String,
    frac: String,
}

impl DecimalValue {
    pub(crate) fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if !decimal_re().is_match(value) {
            return None;
        }
        let (negative, digits) = match value.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, value.strip_prefix('+').unwrap_or(value)),
        };
        let (int, frac) = digits.split_once('.').unwrap_or((digits, ""));
        let int = int.trim_start_matches('0').to_owned();
        let frac = frac.trim_end_matches('0').to_owned();
        Some(Self {
            negative: negative && !(int.is_empty() && frac.is_empty()),
            int,
            frac,
        })
    }

    fn cmp_magnitude(&self, other: &Self) -> Ordering {
        self.int
            .len()
            .cmp(&other.int.len())
            .then_with(|| self.int.cmp(&other.int))
            .then_with(|| self.frac.cmp(&other.frac))
    }
}

impl Ord for DecimalValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.negative, other.negative) {
            (false, true) => Ordering::Greater,
            (true, false) => Ordering::Less,
            (false, false) => self.cmp_magnitude(other),
            (true, true) => other.cmp_magnitude(self),
        }
    }
}

impl PartialOrd for DecimalValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A value in the value space of a numeric primitive.
#[derive(Debug, Clone)]
pub(crate) enum Numeric {
    Decimal(DecimalValue),
    Float(f64),
}

impl Numeric {
    fn parse(value: &str, primitive: Builtin) -> Option<Self> {
        match primitive {
            Builtin::Float | Builtin::Double => {
                let value = value.trim();
                if !float_re().is_match(value) {
                    return None;
                }
                Some(Numeric::Float(match value {
                    "INF" => f64::INFINITY,
                    "-INF" => f64::NEG_INFINITY,
                    other => other.parse().ok()?,
                }))
            }
            _ => DecimalValue::parse(value).map(Numeric::Decimal),
        }
    }

    fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Numeric::Decimal(a), Numeric::Decimal(b)) => Some(a.cmp(b)),
            (Numeric::Float(a), Numeric::Float(b)) => a.partial_cmp(b),
            _ => None,
        }
    }

    /// Equality for enumeration and fixed values; NaN equals itself here.
    fn same(&self, other: &Self) -> bool {
        match (self, other) {
            (Numeric::Float(a), Numeric::Float(b)) if a.is_nan() && b.is_nan() => true,
            _ => self.compare(other) == Some(Ordering::Equal),
        }
    }
}

/// Equality in the value space of `primitive`.
fn values_equal(a: &str, b: &str, primitive: Option<Builtin>) -> bool {
    match primitive {
        Some(p) if p.is_numeric() => match (Numeric::parse(a, p), Numeric::parse(b, p)) {
            (Some(a), Some(b)) => a.same(&b),
            _ => a == b,
        },
        Some(Builtin::Boolean) => {
            let truth = |v: &str| matches!(v.trim(), "true" | "1");
            truth(a) == truth(b)
        }
        _ => a == b,
    }
}

/// Numeric or lexical bound for range facets.
#[derive(Debug, Clone)]
pub(crate) struct Bound {
    raw: String,
    numeric: Option<(Builtin, Numeric)>,
}

impl Bound {
    fn new(raw: &str, primitive: Option<Builtin>) -> Result<Self, String> {
        let numeric = match primitive.filter(|p| p.is_numeric()) {
            Some(p) => Some((
                p,
                Numeric::parse(raw, p).ok_or_else(|| format!("bound '{raw}' is not numeric"))?,
            )),
            None => None,
        };
        Ok(Self {
            raw: raw.trim().to_owned(),
            numeric,
        })
    }

    fn compare(&self, value: &str) -> Option<Ordering> {
        match &self.numeric {
            Some((primitive, bound)) => Numeric::parse(value, *primitive)?.compare(bound),
            None => Some(value.cmp(self.raw.as_str())),
        }
    }
}

/// Constraining facets declared on one restriction step.
#[derive(Debug, Clone, Default)]
pub(crate) struct Facets {
    pub enumeration: Vec<String>,
    /// Alternatives from one step; a value must match at least one.
    pub patterns: Vec<Regex>,
    pub length: Option<usize>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub min_inclusive: Option<Bound>,
    pub max_inclusive: Option<Bound>,
    pub min_exclusive: Option<Bound>,
    pub max_exclusive: Option<Bound>,
    pub total_digits: Option<usize>,
    pub fraction_digits: Option<usize>,
    pub whitespace: Option<WhiteSpace>,
}

impl Facets {
    /// Add one facet element. Returns `Ok(false)` for names that are not facets.
    ///
    /// `primitive` is the built-in the restricted type derives from; range
    /// bounds on numeric primitives are parsed into its value space.
    pub(crate) fn add(
        &mut self,
        facet: &str,
        value: &str,
        primitive: Option<Builtin>,
    ) -> Result<bool, String> {
        let count = || {
            value
                .trim()
                .parse::<usize>()
                .map_err(|_| format!("{facet} value '{value}' is not a non-negative integer"))
        };
        match facet {
            "enumeration" => self.enumeration.push(value.to_owned()),
            "pattern" => self.patterns.push(compile_pattern(value)?),
            "length" => self.length = Some(count()?),
            "minLength" => self.min_length = Some(count()?),
            "maxLength" => self.max_length = Some(count()?),
            "totalDigits" => self.total_digits = Some(count()?),
            "fractionDigits" => self.fraction_digits = Some(count()?),
            "minInclusive" => self.min_inclusive = Some(Bound::new(value, primitive)?),
            "maxInclusive" => self.max_inclusive = Some(Bound::new(value, primitive)?),
            "minExclusive" => self.min_exclusive = Some(Bound::new(value, primitive)?),
            "maxExclusive" => self.max_exclusive = Some(Bound::new(value, primitive)?),
            "whiteSpace" => {
                self.whitespace = Some(
                    WhiteSpace::parse(value)
                        .ok_or_else(|| format!("unknown whiteSpace value '{value}'"))?,
                )
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn check(&self, value: &str, length: usize, primitive: Option<Builtin>) -> Result<(), String> {
        use std::cmp::Ordering::{Equal, Greater, Less};

        if !self.enumeration.is_empty()
            && !self
                .enumeration
                .iter()
                .any(|e| values_equal(e, value, primitive))
        {
            return Err(format!(
                "'{value}' is not one of [{}]",
                self.enumeration.join(", ")
            ));
        }
        if !self.patterns.is_empty() && !self.patterns.iter().any(|re| re.is_match(value)) {
            return Err(format!("'{value}' does not match the required pattern"));
        }
        if self.length.is_some_and(|n| length != n) {
            return Err(format!("'{value}' has length {length}, expected {:?}", self.length));
        }
        if self.min_length.is_some_and(|n| length < n) {
            return Err(format!("'{value}' is shorter than minLength {:?}", self.min_length));
        }
        if self.max_length.is_some_and(|n| length > n) {
            return Err(format!("'{value}' is longer than maxLength {:?}", self.max_length));
        }

        let bounds = [
            (&self.min_inclusive, &[Greater, Equal][..], "minInclusive"),
            (&self.max_inclusive, &[Less, Equal][..], "maxInclusive"),
            (&self.min_exclusive, &[Greater][..], "minExclusive"),
            (&self.max_exclusive, &[Less][..], "maxExclusive"),
        ];
        for (bound, allowed, facet) in bounds {
            if let Some(bound) = bound {
                let within = bound
                    .compare(value)
                    .is_some_and(|ordering| allowed.contains(&ordering));
                if !within {
                    return Err(format!("'{value}' violates {facet} {}", bound.raw));
                }
            }
        }

        if self.total_digits.is_some() || self.fraction_digits.is_some() {
            let digits = value.trim_start_matches(['+', '-']);
            let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, ""));
            let int_part = int_part.trim_start_matches('0');
            let frac_part = frac_part.trim_end_matches('0');
            if self
                .total_digits
                .is_some_and(|n| int_part.len() + frac_part.len() > n)
            {
                return Err(format!("'{value}' has more than {:?} digits", self.total_digits));
            }
            if self.fraction_digits.is_some_and(|n| frac_part.len() > n) {
                return Err(format!(
                    "'{value}' has more than {:?} fraction digits",
                    self.fraction_digits
                ));
            }
        }
        Ok(())
    }
}

/// XSD patterns are implicitly anchored and know the `\i`/`\c` name escapes.
fn compile_pattern(pattern: &str) -> Result<Regex, String> {
    let translated = translate_pattern(pattern);
    Regex::new(&format!("^(?:{translated})$"))
        .map_err(|e| format!("pattern '{pattern}' does not compile: {e}"))
}

/// Rewrite XSD regex syntax into `regex` syntax. `^` and `$` are ordinary
/// characters in XSD (except `^` opening a negated class), `.` excludes
/// both line terminators, and `-[..]` inside a class is subtraction.
fn translate_pattern(pattern: &str) -> String {
    const NAME_START: &str = r"\p{L}_:";
    const NAME_CHAR: &str = r"\p{L}\p{N}._:\-";

    let mut out = String::with_capacity(pattern.len() + 16);
    let mut chars = pattern.chars().peekable();
    let mut class_depth = 0usize;
    let mut class_start = false;
    while let Some(c) = chars.next() {
        let at_class_start = std::mem::take(&mut class_start);
        match c {
            '\\' => match chars.next() {
                Some('i') if class_depth > 0 => out.push_str(NAME_START),
                Some('c') if class_depth > 0 => out.push_str(NAME_CHAR),
                Some('i') => out.push_str(&format!("[{NAME_START}]")),
                Some('c') => out.push_str(&format!("[{NAME_CHAR}]")),
                Some('I') if class_depth == 0 => out.push_str(&format!("[^{NAME_START}]")),
                Some('C') if class_depth == 0 => out.push_str(&format!("[^{NAME_CHAR}]")),
                Some(next) => {
                    out.push('\\');
                    out.push(next);
                }
                None => out.push('\\'),
            },
            '[' => {
                class_depth += 1;
                class_start = true;
                out.push('[');
            }
            ']' if class_depth > 0 => {
                class_depth -= 1;
                out.push(']');
            }
            '-' if class_depth > 0 && chars.peek() == Some(&'[') => out.push_str("--"),
            '^' if at_class_start => out.push('^'),
            '^' | '$' => {
                out.push('\\');
                out.push(c);
            }
            '.' if class_depth == 0 => out.push_str(r"[^\n\r]"),
            _ => out.push(c),
        }
    }
    out
}

#[derive(Debug, Clone)]
pub(crate) enum Variety {
    Atomic(Builtin),
    Restriction(Arc<SimpleType>),
    List(Arc<SimpleType>),
    Union(Vec<Arc<SimpleType>>),
}

#[derive(Debug, Clone)]
pub(crate) struct SimpleType {
    pub variety: Variety,
    pub facets: Facets,
}

impl SimpleType {
    pub(crate) fn atomic(builtin: Builtin) -> Self {
        Self {
            variety: Variety::Atomic(builtin),
            facets: Facets::default(),
        }
    }

    /// The built-in this type is ultimately derived from, for atomic types.
    pub(crate) fn primitive(&self) -> Option<Builtin> {
        match &self.variety {
            Variety::Atomic(builtin) => Some(*builtin),
            Variety::Restriction(base) => base.primitive(),
            Variety::List(_) | Variety::Union(_) => None,
        }
    }

    fn whitespace(&self) -> WhiteSpace {
        if let Some(ws) = self.facets.whitespace {
            return ws;
        }
        match &self.variety {
            Variety::Atomic(builtin) => builtin.whitespace(),
            Variety::Restriction(base) => base.whitespace(),
            Variety::List(_) => WhiteSpace::Collapse,
            Variety::Union(_) => WhiteSpace::Preserve,
        }
    }

    pub(crate) fn normalize(&self, value: &str) -> String {
        self.whitespace().apply(value)
    }

    /// Whether two lexical forms denote the same value of this type.
    pub(crate) fn same_value(&self, a: &str, b: &str) -> bool {
        values_equal(&self.normalize(a), &self.normalize(b), self.primitive())
    }

    pub(crate) fn validate(&self, value: &str) -> Result<(), String> {
        let value = self.normalize(value);
        let length = match &self.variety {
            Variety::Atomic(builtin) => {
                builtin.check_lexical(&value)?;
                builtin.length_of(&value)
            }
            Variety::Restriction(base) => {
                base.validate(&value)?;
                match self.list_items() {
                    Some(_) => value.split(' ').filter(|s| !s.is_empty()).count(),
                    None => self
                        .primitive()
                        .map_or(value.chars().count(), |b| b.length_of(&value)),
                }
            }
            Variety::List(item) => {
                let items: Vec<&str> = value.split(' ').filter(|s| !s.is_empty()).collect();
                for token in &items {
                    item.validate(token)?;
                }
                items.len()
            }
            Variety::Union(members) => {
                if !members.iter().any(|member| member.validate(&value).is_ok()) {
                    return Err(format!("'{value}' matches no member of the union"));
                }
                value.chars().count()
            }
        };
        self.facets.check(&value, length, self.primitive())
    }

    fn list_items(&self) -> Option<&Arc<SimpleType>> {
        match &self.variety {
            Variety::List(item) => Some(item),
            Variety::Restriction(base) => base.list_items(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn builtin(b: Builtin) -> SimpleType {
        SimpleType::atomic(b)
    }

    fn restricted(base: Builtin, facets: &[(&str, &str)]) -> SimpleType {
        let mut own = Facets::default();
        for (facet, value) in facets {
            assert!(own.add(facet, value, Some(base)).unwrap());
        }
        SimpleType {
            variety: Variety::Restriction(Arc::new(builtin(base))),
            facets: own,
        }
    }

    #[test]
    fn test_int_lexical_and_range() {
        let int = builtin(Builtin::Int);
        assert!(int.validate("42").is_ok());
        assert!(int.validate(" -7 ").is_ok());
        assert!(int.validate("1.5").is_err());
        assert!(int.validate("abc").is_err());
        assert!(int.validate("2147483648").is_err());
    }

    #[test]
    fn test_sign_restricted_integers() {
        assert!(builtin(Builtin::PositiveInteger).validate("0").is_err());
        assert!(builtin(Builtin::NonNegativeInteger).validate("-0").is_ok());
        assert!(builtin(Builtin::NegativeInteger).validate("-1").is_ok());
        assert!(builtin(Builtin::UnsignedByte).validate("256").is_err());
    }

    #[test]
    fn test_string_preserves_whitespace() {
        let string = restricted(Builtin::String, &[("length", "3")]);
        assert!(string.validate(" a ").is_ok());
        let token = restricted(Builtin::Token, &[("length", "1")]);
        assert!(token.validate(" a ").is_ok());
    }

    #[test]
    fn test_dates_and_times() {
        assert!(builtin(Builtin::Date).validate("2024-02-29").is_ok());
        assert!(builtin(Builtin::Date).validate("2024-13-01").is_err());
        assert!(builtin(Builtin::DateTime)
            .validate("2024-01-01T12:30:00.5+02:00")
            .is_ok());
        assert!(builtin(Builtin::DateTime).validate("2024-01-01").is_err());
        assert!(builtin(Builtin::Time).validate("25:00:00").is_err());
        assert!(builtin(Builtin::Duration).validate("P1Y2MT3H").is_ok());
        assert!(builtin(Builtin::Duration).validate("P").is_err());
    }

    #[test]
    fn test_dates_respect_month_length_and_year_zero() {
        let date = builtin(Builtin::Date);
        assert!(date.validate("2023-02-30").is_err());
        assert!(date.validate("2023-02-29").is_err());
        assert!(date.validate("2000-02-29").is_ok());
        assert!(date.validate("1900-02-29").is_err());
        assert!(date.validate("2023-04-31").is_err());
        assert!(date.validate("2023-12-31").is_ok());
        assert!(date.validate("0000-01-01").is_err());
        assert!(date.validate("-0001-01-01").is_ok());
        assert!(date.validate("012023-01-01").is_err());
        assert!(builtin(Builtin::DateTime).validate("2023-02-30T00:00:00").is_err());
        assert!(builtin(Builtin::GYear).validate("0000").is_err());
        assert!(builtin(Builtin::GYear).validate("2024Z").is_ok());
    }

    #[test]
    fn test_enumeration_and_pattern() {
        let color = restricted(Builtin::String, &[("enumeration", "red"), ("enumeration", "blue")]);
        assert!(color.validate("red").is_ok());
        assert!(color.validate("green").is_err());

        let code = restricted(Builtin::String, &[("pattern", r"[A-Z]{3}")]);
        assert!(code.validate("ABC").is_ok());
        assert!(code.validate("ABCD").is_err());
    }

    #[test]
    fn test_pattern_dollar_and_caret_are_literals() {
        let money = restricted(Builtin::String, &[("pattern", "a$b")]);
        assert!(money.validate("a$b").is_ok());
        assert!(money.validate("ab").is_err());

        let caret = restricted(Builtin::String, &[("pattern", "x^y|[^0-9]+")]);
        assert!(caret.validate("x^y").is_ok());
        assert!(caret.validate("abc").is_ok());
        assert!(caret.validate("12").is_err());
    }

    #[test]
    fn test_pattern_translation() {
        assert_eq!(translate_pattern(r"\i\c*"), r"[\p{L}_:][\p{L}\p{N}._:\-]*");
        assert_eq!(translate_pattern(r"[a-z-[aeiou]]"), r"[a-z--[aeiou]]");
        assert_eq!(translate_pattern(r"a.b"), r"a[^\n\r]b");
        assert_eq!(translate_pattern(r"\\i"), r"\\i");

        let consonant = restricted(Builtin::String, &[("pattern", "[a-z-[aeiou]]+")]);
        assert!(consonant.validate("xyz").is_ok());
        assert!(consonant.validate("xa").is_err());
    }

    #[test]
    fn test_numeric_enumeration_compares_values() {
        let one = restricted(Builtin::Int, &[("enumeration", "1"), ("enumeration", "20")]);
        assert!(one.validate("1").is_ok());
        assert!(one.validate("01").is_ok());
        assert!(one.validate("+1").is_ok());
        assert!(one.validate("2").is_err());

        let half = restricted(Builtin::Decimal, &[("enumeration", "0.5")]);
        assert!(half.validate(".50").is_ok());
        assert!(half.validate("0.05").is_err());

        let flag = restricted(Builtin::Boolean, &[("enumeration", "true")]);
        assert!(flag.validate("1").is_ok());
        assert!(flag.validate("false").is_err());
    }

    #[test]
    fn test_same_value_for_fixed() {
        let int = builtin(Builtin::Int);
        assert!(int.same_value("03", "3"));
        assert!(int.same_value(" -0 ", "0"));
        assert!(!int.same_value("30", "3"));
        let string = builtin(Builtin::String);
        assert!(!string.same_value("03", "3"));
    }

    #[test]
    fn test_integer_bounds_are_exact() {
        let capped = restricted(Builtin::Long, &[("maxInclusive", "9007199254740992")]);
        assert!(capped.validate("9007199254740992").is_ok());
        assert!(capped.validate("9007199254740993").is_err());

        let tiny = restricted(Builtin::Decimal, &[("minExclusive", "-0.001")]);
        assert!(tiny.validate("-0.0009").is_ok());
        assert!(tiny.validate("-0.0010").is_err());
        assert!(tiny.validate("-1").is_err());
    }

    #[test]
    fn test_decimal_ordering() {
        let d = |v: &str| DecimalValue::parse(v).unwrap();
        assert!(d("10") > d("9.99"));
        assert!(d("-10") < d("-9.99"));
        assert!(d("0.5") > d("0.45"));
        assert_eq!(d("-0.0"), d("+000"));
        assert!(DecimalValue::parse("1e3").is_none());
    }

    #[test]
    fn test_float_bounds() {
        let unit = restricted(Builtin::Double, &[("minInclusive", "0"), ("maxInclusive", "1E0")]);
        assert!(unit.validate("0.25").is_ok());
        assert!(unit.validate("INF").is_err());
        assert!(unit.validate("NaN").is_err());
    }

    #[test]
    fn test_lexical_patterns_compile() {
        let patterns = [
            integer_re(),
            decimal_re(),
            float_re(),
            name_re(),
            ncname_re(),
            nmtoken_re(),
            language_re(),
            timezone_re(),
            date_re(),
            time_re(),
            gyear_re(),
            duration_re(),
        ];
        for lexical in patterns {
            assert!(lexical.0.is_some(), "{lexical:?}");
        }
    }

    #[test]
    fn test_numeric_bounds() {
        let percent = restricted(
            Builtin::Integer,
            &[("minInclusive", "0"), ("maxExclusive", "101")],
        );
        assert!(percent.validate("100").is_ok());
        assert!(percent.validate("101").is_err());
        assert!(percent.validate("-1").is_err());
    }

    #[test]
    fn test_digits() {
        let price = restricted(
            Builtin::Decimal,
            &[("totalDigits", "5"), ("fractionDigits", "2")],
        );
        assert!(price.validate("123.45").is_ok());
        assert!(price.validate("123.456").is_err());
        assert!(price.validate("1234.50").is_ok());
    }

    #[test]
    fn test_list_and_union() {
        let ints = SimpleType {
            variety: Variety::List(Arc::new(builtin(Builtin::Int))),
            facets: Facets::default(),
        };
        assert!(ints.validate("1 2\n3").is_ok());
        assert!(ints.validate("1 x").is_err());

        let short_list = SimpleType {
            variety: Variety::Restriction(Arc::new(ints)),
            facets: {
                let mut f = Facets::default();
                f.add("maxLength", "2", None).unwrap();
                f
            },
        };
        assert!(short_list.validate("1 2").is_ok());
        assert!(short_list.validate("1 2 3").is_err());

        let int_or_bool = SimpleType {
            variety: Variety::Union(vec![
                Arc::new(builtin(Builtin::Int)),
                Arc::new(builtin(Builtin::Boolean)),
            ]),
            facets: Facets::default(),
        };
        assert!(int_or_bool.validate("true").is_ok());
        assert!(int_or_bool.validate("7").is_ok());
        assert!(int_or_bool.validate("x").is_err());
    }

    #[test]
    fn test_binary_lengths() {
        let hex = restricted(Builtin::HexBinary, &[("length", "2")]);
        assert!(hex.validate("0aFF").is_ok());
        assert!(hex.validate("0aF").is_err());
        let b64 = restricted(Builtin::Base64Binary, &[("length", "1")]);
        assert!(b64.validate("QQ==").is_ok());
        assert!(b64.validate("QQ=").is_err());
    }

    #[test]
    fn test_any_uri_accepts_relative() {
        assert!(builtin(Builtin::AnyUri).validate("https://example.com/a").is_ok());
        assert!(builtin(Builtin::AnyUri).validate("../docs/a.html").is_ok());
    }

    #[test]
    fn test_builtin_lookup_round_trips_names() {
        for &b in Builtin::ALL {
            assert_eq!(Builtin::from_local(b.local_name()), Some(b));
        }
        assert_eq!(Builtin::from_local("nope"), None);
    }
}
