//! Line codec for the member store file.
//!
//! One record per line: card id, display name, then one flag per
//! [`Capability`] in declaration order. Fields are comma separated and use
//! CSV quoting, so a name may contain commas, quotes or even line breaks.
//!
//! ```text
//! AABB0000000000000000,Alice,true,false,false,true,false,false
//! CCDD0000000000000000,"Doe, Jane",false,false,false,false,false,true
//! ```
//!
//! Decoding is lenient in the same places the store has always been: missing
//! trailing flags read as `false`, and so does anything that is not a
//! recognized boolean literal.

use crate::error::{StorageError, StorageResult};
use tagin_core::{CardId, Capability, MemberRecord, Permissions};

/// Fewest fields a record may have: card id and name.
pub const MIN_FIELDS: usize = 2;

/// Comment marker for lines hand-edited into the store.
const COMMENT: char = '#';

/// One record decoded from the store, tagged with the line it started on.
#[derive(Debug)]
pub struct StoredLine {
    /// 1-based line number of the first physical line of the record.
    pub line: usize,
    pub record: StorageResult<MemberRecord>,
}

/// Encode a record as one store line, without the trailing newline.
pub fn encode_record(record: &MemberRecord) -> String {
    let mut line = String::with_capacity(64);
    line.push_str(record.card_id.as_str());
    line.push(',');
    push_field(&mut line, &record.name);
    for (_, granted) in record.permissions.iter() {
        line.push(',');
        line.push_str(if granted { "true" } else { "false" });
    }
    line
}

/// Decode a single record.
///
/// # Errors
///
/// Returns [`StorageError::Malformed`] for a blank or comment line, an
/// unterminated quote, fewer than two fields, or an invalid card id.
pub fn decode_record(line: &str) -> StorageResult<MemberRecord> {
    parse_store(line)
        .into_iter()
        .next()
        .map(|stored| stored.record)
        .unwrap_or_else(|| Err(StorageError::Malformed("empty line".to_string())))
}

/// Decode a whole store file.
///
/// Blank lines and `#` comment lines are skipped silently. Every other
/// record is returned, successful or not, so the caller can report bad
/// lines by number.
pub fn parse_store(text: &str) -> Vec<StoredLine> {
    let mut parser = Parser::new(text);
    let mut out = Vec::new();

    while let Some((line, fields)) = parser.next_record() {
        let record = fields.and_then(|fields| decode_fields(&fields));
        out.push(StoredLine { line, record });
    }
    out
}

/// Parse a boolean the way the store's first writer did.
///
/// Accepts `1 t T TRUE true True` and `0 f F FALSE false False`; anything
/// else is `None`.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

fn decode_fields(fields: &[String]) -> StorageResult<MemberRecord> {
    if fields.len() < MIN_FIELDS {
        return Err(StorageError::Malformed(format!(
            "expected at least {MIN_FIELDS} fields, got {}",
            fields.len()
        )));
    }

    let card_id = CardId::new(&fields[0])?;
    let permissions = Capability::ALL
        .into_iter()
        .zip(fields.iter().skip(MIN_FIELDS).map(Some).chain(std::iter::repeat(None)))
        .fold(Permissions::default(), |perms, (cap, field)| {
            let granted = field.and_then(|f| parse_bool(f)).unwrap_or(false);
            perms.with(cap, granted)
        });

    Ok(MemberRecord::new(card_id, fields[1].clone(), permissions))
}

fn push_field(out: &mut String, field: &str) {
    if field.contains([',', '"', '\r', '\n']) {
        out.push('"');
        out.push_str(&field.replace('"', "\"\""));
        out.push('"');
    } else {
        out.push_str(field);
    }
}

/// Minimal CSV record splitter with line tracking.
///
/// A quoted field may span lines only when it is closed properly. On a bad
/// quote the parser rewinds and resumes after the record's first physical
/// line, so one damaged line never swallows the records behind it.
struct Parser<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            chars: text.chars().peekable(),
            line: 1,
        }
    }

    /// Next non-blank, non-comment record and its starting line.
    fn next_record(&mut self) -> Option<(usize, StorageResult<Vec<String>>)> {
        loop {
            let start = self.line;
            match *self.chars.peek()? {
                '\n' => {
                    self.chars.next();
                    self.line += 1;
                }
                '\r' => {
                    self.chars.next();
                }
                COMMENT => self.skip_line(),
                _ => {
                    let checkpoint = self.chars.clone();
                    let fields = match self.read_fields() {
                        Ok(fields) => fields,
                        Err(e) => {
                            self.chars = checkpoint;
                            self.line = start;
                            self.skip_line();
                            return Some((start, Err(e)));
                        }
                    };
                    if fields.len() == 1 && fields[0].trim().is_empty() {
                        continue;
                    }
                    return Some((start, Ok(fields)));
                }
            }
        }
    }

    fn skip_line(&mut self) {
        for c in self.chars.by_ref() {
            if c == '\n' {
                self.line += 1;
                break;
            }
        }
    }

    fn read_fields(&mut self) -> StorageResult<Vec<String>> {
        let mut fields = Vec::new();
        let mut field = String::new();
        let mut in_quotes = false;
        let mut field_start = true;

        loop {
            let Some(c) = self.chars.next() else {
                if in_quotes {
                    return Err(StorageError::Malformed(
                        "unterminated quoted field".to_string(),
                    ));
                }
                break;
            };

            if in_quotes {
                match c {
                    '"' if self.chars.peek() == Some(&'"') => {
                        self.chars.next();
                        field.push('"');
                    }
                    '"' => {
                        if !matches!(self.chars.peek(), None | Some(',' | '\r' | '\n')) {
                            return Err(StorageError::Malformed(
                                "text after closing quote".to_string(),
                            ));
                        }
                        in_quotes = false;
                    }
                    '\n' => {
                        self.line += 1;
                        field.push(c);
                    }
                    _ => field.push(c),
                }
                continue;
            }

            match c {
                '"' if field_start => in_quotes = true,
                ',' => {
                    fields.push(std::mem::take(&mut field));
                    field_start = true;
                    continue;
                }
                '\r' if self.chars.peek() == Some(&'\n') => {}
                '\n' => {
                    self.line += 1;
                    break;
                }
                _ => field.push(c),
            }
            field_start = false;
        }

        fields.push(field);
        Ok(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn card(id: &str) -> CardId {
        CardId::new(id).unwrap()
    }

    #[test]
    fn test_encode_plain_record() {
        let record = MemberRecord::new(
            card("AABB0000000000000000"),
            "Alice",
            Permissions::default()
                .with(Capability::Printer3d, true)
                .with(Capability::Cnc, true),
        );

        assert_eq!(
            encode_record(&record),
            "AABB0000000000000000,Alice,true,false,false,true,false,false"
        );
    }

    #[test]
    fn test_encode_quotes_special_names() {
        let record = MemberRecord::new(
            card("CCDD0000000000000000"),
            "Jane \"JD\" Doe, Jr.",
            Permissions::default(),
        );

        let line = encode_record(&record);
        assert!(line.starts_with("CCDD0000000000000000,\"Jane \"\"JD\"\" Doe, Jr.\","));
        assert_eq!(decode_record(&line).unwrap(), record);
    }

    #[test]
    fn test_name_with_line_break_survives() {
        let record = MemberRecord::new(
            card("CCDD0000000000000000"),
            "two\nlines",
            Permissions::default(),
        );
        let text = format!("{}\n{}\n", encode_record(&record), "AABB0000000000000000,Alice");

        let parsed = parse_store(&text);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].record.as_ref().unwrap().name, "two\nlines");
        assert_eq!(parsed[1].line, 3);
    }

    #[test]
    fn test_missing_flags_default_to_false() {
        let record = decode_record("AABB0000000000000000,Alice,true").unwrap();

        assert!(record.permissions.get(Capability::Printer3d));
        assert!(!record.permissions.get(Capability::Laser));
        assert!(!record.permissions.get(Capability::Electronics));
    }

    #[test]
    fn test_extra_fields_are_ignored() {
        let record =
            decode_record("AABB0000000000000000,Alice,1,0,0,0,0,1,surplus,more").unwrap();
        assert!(record.permissions.get(Capability::Printer3d));
        assert!(record.permissions.get(Capability::Electronics));
    }

    #[rstest]
    #[case("1", Some(true))]
    #[case("t", Some(true))]
    #[case("T", Some(true))]
    #[case("TRUE", Some(true))]
    #[case("true", Some(true))]
    #[case("True", Some(true))]
    #[case("0", Some(false))]
    #[case("f", Some(false))]
    #[case("FALSE", Some(false))]
    #[case("False", Some(false))]
    #[case("yes", None)]
    #[case("tRuE", None)]
    #[case("", None)]
    fn test_parse_bool(#[case] input: &str, #[case] expected: Option<bool>) {
        assert_eq!(parse_bool(input), expected);
    }

    #[test]
    fn test_unparseable_flag_reads_false() {
        let record = decode_record("AABB0000000000000000,Alice,yes,1").unwrap();
        assert!(!record.permissions.get(Capability::Printer3d));
        assert!(record.permissions.get(Capability::Laser));
    }

    #[rstest]
    #[case::single_field("AABB0000000000000000")]
    #[case::bad_card_id("not-a-card,Alice,true")]
    #[case::short_card_id("AABB,Alice")]
    #[case::unterminated_quote("AABB0000000000000000,\"Alice")]
    #[case::text_after_quote("AABB0000000000000000,\"Alice\"x,true")]
    #[case::blank("")]
    fn test_decode_rejects(#[case] line: &str) {
        assert!(decode_record(line).is_err());
    }

    #[test]
    fn test_parse_store_skips_blank_and_comment_lines() {
        let text = "# members\n\nAABB0000000000000000,Alice\n   \n\
                    bogus\r\nCCDD0000000000000000,Bob,false,true\r\n";

        let parsed = parse_store(text);
        assert_eq!(parsed.len(), 3);

        assert_eq!(parsed[0].line, 3);
        assert_eq!(parsed[0].record.as_ref().unwrap().name, "Alice");

        assert_eq!(parsed[1].line, 5);
        assert!(parsed[1].record.is_err());

        assert_eq!(parsed[2].line, 6);
        let bob = parsed[2].record.as_ref().unwrap();
        assert_eq!(bob.name, "Bob");
        assert!(bob.permissions.get(Capability::Laser));
    }

    #[test]
    fn test_unterminated_quote_damages_only_its_line() {
        let text = "AABB0000000000000000,\"Alice,true\n\
                    CCDD0000000000000000,Bob,false,true\n\
                    EEFF0000000000000000,Carol,true\n";

        let parsed = parse_store(text);
        assert_eq!(parsed.len(), 3);

        assert_eq!(parsed[0].line, 1);
        assert!(parsed[0].record.is_err());

        assert_eq!(parsed[1].line, 2);
        assert_eq!(parsed[1].record.as_ref().unwrap().name, "Bob");
        assert_eq!(parsed[2].line, 3);
        assert_eq!(parsed[2].record.as_ref().unwrap().name, "Carol");
    }

    #[test]
    fn test_stray_quote_does_not_pair_with_a_later_line() {
        let text = "AABB0000000000000000,\"Alice,true\n\
                    CCDD0000000000000000,Bob,false,true\n\
                    EEFF0000000000000000,\"Doe, Jane\",true\n";

        let parsed = parse_store(text);
        let names: Vec<_> = parsed
            .iter()
            .filter_map(|stored| stored.record.as_ref().ok())
            .map(|record| record.name.as_str())
            .collect();

        assert!(parsed[0].record.is_err());
        assert_eq!(names, ["Bob", "Doe, Jane"]);
        assert_eq!(parsed[2].line, 3);
    }

    #[test]
    fn test_lowercase_card_id_is_normalized() {
        let record = decode_record("aabb0000000000000000,Alice").unwrap();
        assert_eq!(record.card_id.as_str(), "AABB0000000000000000");
    }
}
