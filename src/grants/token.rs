//! Identifier tokenizer for exported account SQL
//!
//! Account names, hosts and database names appear in four lexical forms:
//! `` `name` ``, `"name"`, `'name'` or bare `name`. All quoted forms share one
//! rule: the opening delimiter must be closed by the same character. Bare
//! identifiers accept ASCII alphanumerics, `$`, `_` and the Unicode range
//! U+0080..=U+FFFF.

/// How an identifier was written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quoting {
    Backtick,
    Double,
    Single,
    Bare,
}

impl Quoting {
    /// The quoting style that opens with `c`, if any
    pub fn from_delimiter(c: char) -> Option<Self> {
        match c {
            '`' => Some(Self::Backtick),
            '"' => Some(Self::Double),
            '\'' => Some(Self::Single),
            _ => None,
        }
    }

    fn delimiter(self) -> Option<char> {
        match self {
            Self::Backtick => Some('`'),
            Self::Double => Some('"'),
            Self::Single => Some('\''),
            Self::Bare => None,
        }
    }
}

/// Characters allowed in an unquoted identifier
pub fn is_bare_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '$' || c == '_' || ('\u{80}'..='\u{FFFF}').contains(&c)
}

/// A resolved identifier with its source span
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    /// Logical name, delimiters removed and surrounding whitespace trimmed
    pub value: String,
    pub quoting: Quoting,
}

/// Forward-only cursor over one line
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    /// Cursor positioned at byte offset `pos` (must be a char boundary)
    pub fn at(src: &'a str, pos: usize) -> Self {
        Self { src, pos }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    pub fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// Skip whitespace; returns how many bytes were skipped
    pub fn skip_ws(&mut self) -> usize {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !c.is_whitespace() {
                break;
            }
            self.pos += c.len_utf8();
        }
        self.pos - start
    }

    /// Consume `c` if it is next
    pub fn eat_char(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    /// Consume an ASCII keyword, case-insensitively
    pub fn eat_keyword(&mut self, keyword: &str) -> bool {
        let rest = self.rest().as_bytes();
        if rest.len() >= keyword.len()
            && rest[..keyword.len()].eq_ignore_ascii_case(keyword.as_bytes())
        {
            self.pos += keyword.len();
            true
        } else {
            false
        }
    }

    /// Read a quoted string whose body may be empty (credential hashes)
    pub fn read_quoted(&mut self) -> Option<String> {
        self.read_delimited(true)
    }

    /// Read an identifier in any of the four lexical forms
    pub fn read_ident(&mut self) -> Option<Ident> {
        let first = self.peek()?;
        if let Some(quoting) = Quoting::from_delimiter(first) {
            let value = self.read_delimited(false)?;
            return Some(Ident {
                value: value.trim().to_string(),
                quoting,
            });
        }

        let start = self.pos;
        while let Some(c) = self.peek() {
            if !is_bare_char(c) {
                break;
            }
            self.pos += c.len_utf8();
        }
        if self.pos == start {
            return None;
        }
        Some(Ident {
            value: self.src[start..self.pos].to_string(),
            quoting: Quoting::Bare,
        })
    }

    fn read_delimited(&mut self, allow_empty: bool) -> Option<String> {
        let quoting = self.peek().and_then(Quoting::from_delimiter)?;
        let delimiter = quoting.delimiter()?;
        let body_start = self.pos + delimiter.len_utf8();
        let body_len = self.src[body_start..].find(delimiter)?;
        if body_len == 0 && !allow_empty {
            return None;
        }
        let body = &self.src[body_start..body_start + body_len];
        self.pos = body_start + body_len + delimiter.len_utf8();
        Some(body.to_string())
    }
}

/// Find the first `user@host` pair in a line
pub fn find_user_host(line: &str) -> Option<(String, String)> {
    for (offset, _) in line.char_indices() {
        let mut cursor = Cursor::at(line, offset);
        let Some(user) = cursor.read_ident() else {
            continue;
        };
        cursor.skip_ws();
        if !cursor.eat_char('@') {
            continue;
        }
        cursor.skip_ws();
        let Some(host) = cursor.read_ident() else {
            continue;
        };
        if user.value.is_empty() || host.value.is_empty() {
            continue;
        }
        return Some((user.value, host.value));
    }
    None
}

/// A credential clause `IDENTIFIED BY PASSWORD <quoted>` located in a line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialClause {
    /// Byte span including the whitespace that precedes the clause
    pub start: usize,
    pub end: usize,
    pub hash: String,
}

/// Find the first credential clause at or after byte offset `from`
pub fn find_credential(line: &str, from: usize) -> Option<CredentialClause> {
    for (offset, _) in line[from..].char_indices() {
        let keyword_at = from + offset;
        let mut cursor = Cursor::at(line, keyword_at);
        if !cursor.eat_keyword("IDENTIFIED") {
            continue;
        }
        if cursor.skip_ws() == 0 || !cursor.eat_keyword("BY") {
            continue;
        }
        if cursor.skip_ws() == 0 || !cursor.eat_keyword("PASSWORD") {
            continue;
        }
        if cursor.skip_ws() == 0 {
            continue;
        }
        let Some(hash) = cursor.read_quoted() else {
            continue;
        };
        let start = line[..keyword_at].trim_end().len().max(from);
        return Some(CredentialClause {
            start,
            end: cursor.pos(),
            hash: hash.trim().to_string(),
        });
    }
    None
}

/// Remove every credential clause from a line
pub fn strip_credentials(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut from = 0;
    while let Some(clause) = find_credential(line, from) {
        out.push_str(&line[from..clause.start]);
        from = clause.end;
    }
    out.push_str(&line[from..]);
    out
}

/// Database named by a `ON <db>.*` scope clause; `None` for `ON *.*` or
/// table-level scopes
pub fn find_grant_database(line: &str) -> Option<String> {
    for (offset, _) in line.char_indices() {
        let preceded_by_ident = line[..offset].chars().next_back().is_some_and(is_bare_char);
        if preceded_by_ident {
            continue;
        }
        let mut cursor = Cursor::at(line, offset);
        if !cursor.eat_keyword("ON") || cursor.skip_ws() == 0 {
            continue;
        }
        let Some(database) = cursor.read_ident() else {
            continue;
        };
        cursor.skip_ws();
        if !cursor.eat_char('.') {
            continue;
        }
        cursor.skip_ws();
        if !cursor.eat_char('*') {
            continue;
        }
        if database.value.is_empty() || database.value == "*" {
            return None;
        }
        return Some(database.value);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_quote_forms_resolve_to_same_name() {
        for src in ["`app`", "\"app\"", "'app'", "app"] {
            let ident = Cursor::new(src).read_ident().unwrap();
            assert_eq!(ident.value, "app", "form {src}");
        }
    }

    #[test]
    fn test_mismatched_delimiter_is_rejected() {
        assert!(Cursor::new("'app`").read_ident().is_none());
        assert!(Cursor::new("`app\"").read_ident().is_none());
    }

    #[test]
    fn test_bare_ident_accepts_unicode_and_specials() {
        let ident = Cursor::new("bücher$_1 rest").read_ident().unwrap();
        assert_eq!(ident.value, "bücher$_1");
        assert_eq!(ident.quoting, Quoting::Bare);

        let ident = Cursor::new("пользователь@host").read_ident().unwrap();
        assert_eq!(ident.value, "пользователь");
    }

    #[test]
    fn test_bare_ident_stops_at_punctuation() {
        let mut cursor = Cursor::new("db-name");
        assert_eq!(cursor.read_ident().unwrap().value, "db");
        assert_eq!(cursor.rest(), "-name");
    }

    #[test]
    fn test_find_user_host_forms() {
        assert_eq!(
            find_user_host("CREATE USER 'u1'@'%' IDENTIFIED BY PASSWORD 'x';"),
            Some(("u1".to_string(), "%".to_string()))
        );
        assert_eq!(
            find_user_host("GRANT ALL ON `db1`.* TO `u2` @ \"localhost\";"),
            Some(("u2".to_string(), "localhost".to_string()))
        );
        assert_eq!(
            find_user_host("CREATE USER app@localhost;"),
            Some(("app".to_string(), "localhost".to_string()))
        );
        assert_eq!(find_user_host("GRANT ALL ON db.* TO nobody;"), None);
    }

    #[test]
    fn test_find_credential() {
        let line = "CREATE USER 'u'@'h' identified  by password '*ABC';";
        let clause = find_credential(line, 0).unwrap();
        assert_eq!(clause.hash, "*ABC");
        assert_eq!(&line[clause.end..], ";");
        assert!(find_credential("CREATE USER 'u'@'h';", 0).is_none());
    }

    #[test]
    fn test_strip_credentials() {
        let line = "GRANT USAGE ON *.* TO 'u'@'h' IDENTIFIED BY PASSWORD \"*ABC\";";
        assert_eq!(strip_credentials(line), "GRANT USAGE ON *.* TO 'u'@'h';");
    }

    #[test]
    fn test_find_grant_database() {
        assert_eq!(
            find_grant_database("GRANT ALL ON `db1`.* TO 'u'@'%';"),
            Some("db1".to_string())
        );
        assert_eq!(
            find_grant_database("grant select on shop . * to 'u'@'%';"),
            Some("shop".to_string())
        );
        assert_eq!(find_grant_database("GRANT USAGE ON *.* TO 'u'@'%';"), None);
        assert_eq!(
            find_grant_database("GRANT SELECT ON `db`.`t1` TO 'u'@'%';"),
            None
        );
    }
}
