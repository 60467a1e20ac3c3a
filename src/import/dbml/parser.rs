use super::lexer::{LexError, Lexer, Spanned, Token};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("Lex error: {0}")]
    Lex(#[from] LexError),
    #[error("Unexpected {found} at line {line}, column {column}, expected {expected}")]
    Unexpected {
        found: String,
        expected: &'static str,
        line: usize,
        column: usize,
    },
}

impl ParseError {
    pub fn position(&self) -> (usize, usize) {
        match self {
            ParseError::Lex(e) => e.position(),
            ParseError::Unexpected { line, column, .. } => (*line, *column),
        }
    }
}

/// `schema.table.column` or `table.(a, b)`
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
    pub schema: Option<String>,
    pub table: String,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefOp {
    /// `>`: left is many, right is one
    ManyToOne,
    /// `<`: left is one, right is many
    OneToMany,
    /// `-`
    OneToOne,
    /// `<>`
    ManyToMany,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RefDecl {
    pub name: Option<String>,
    pub left: Endpoint,
    pub op: RefOp,
    pub right: Endpoint,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InlineRef {
    pub op: RefOp,
    pub target: Endpoint,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ColumnSettings {
    pub primary_key: bool,
    /// `Some(false)` for `not null`, `Some(true)` for an explicit `null`
    pub nullable: Option<bool>,
    pub unique: bool,
    pub increment: bool,
    pub default: Option<String>,
    pub note: Option<String>,
    pub refs: Vec<InlineRef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDecl {
    pub name: String,
    /// Type as written, arguments included, array brackets excluded
    pub type_name: String,
    pub is_array: bool,
    pub settings: ColumnSettings,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IndexPart {
    Column(String),
    Expression(String),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct IndexDecl {
    pub parts: Vec<IndexPart>,
    pub name: Option<String>,
    pub unique: bool,
    pub primary_key: bool,
    pub index_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableDecl {
    pub schema: Option<String>,
    pub name: String,
    pub alias: Option<String>,
    pub columns: Vec<ColumnDecl>,
    pub indexes: Vec<IndexDecl>,
    pub note: Option<String>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumDecl {
    pub schema: Option<String>,
    pub name: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    pub tables: Vec<TableDecl>,
    pub refs: Vec<RefDecl>,
    pub enums: Vec<EnumDecl>,
    /// Block kinds that were read and ignored (`Project`, `TableGroup`, `Note`, ...)
    pub skipped_blocks: Vec<String>,
}

pub struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

impl Parser {
    pub fn new(input: &str) -> Result<Self, ParseError> {
        let tokens = Lexer::new(input).tokenize()?;
        Ok(Self { tokens, pos: 0 })
    }

    fn spanned(&self) -> Option<&Spanned> {
        self.tokens.get(self.pos).or_else(|| self.tokens.last())
    }

    fn peek(&self) -> &Token {
        self.spanned().map(|s| &s.token).unwrap_or(&Token::Eof)
    }

    fn peek_at(&self, offset: usize) -> &Token {
        self.tokens.get(self.pos + offset).map(|s| &s.token).unwrap_or(&Token::Eof)
    }

    fn line(&self) -> usize {
        self.spanned().map(|s| s.line).unwrap_or(1)
    }

    fn advance(&mut self) -> Token {
        let tok = self.peek().clone();
        self.pos += 1;
        tok
    }

    fn unexpected(&self, expected: &'static str) -> ParseError {
        let (line, column) = self.spanned().map(|s| (s.line, s.column)).unwrap_or((1, 1));
        ParseError::Unexpected {
            found: self.peek().describe(),
            expected,
            line,
            column,
        }
    }

    fn expect(&mut self, expected: Token, what: &'static str) -> Result<(), ParseError> {
        if *self.peek() == expected {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(what))
        }
    }

    /// Identifier or quoted name
    fn expect_name(&mut self) -> Result<String, ParseError> {
        match self.peek().clone() {
            Token::Ident(s) | Token::Str(s) => {
                self.advance();
                Ok(s)
            }
            _ => Err(self.unexpected("name")),
        }
    }

    fn check_ident(&self, name: &str) -> bool {
        matches!(self.peek(), Token::Ident(s) if s.eq_ignore_ascii_case(name))
    }

    fn skip_newlines(&mut self) {
        while *self.peek() == Token::Newline {
            self.advance();
        }
    }

    fn at_line_end(&self) -> bool {
        matches!(self.peek(), Token::Newline | Token::RBrace | Token::Eof)
    }

    pub fn parse(&mut self) -> Result<Document, ParseError> {
        let mut doc = Document::default();

        loop {
            self.skip_newlines();
            if *self.peek() == Token::Eof {
                return Ok(doc);
            }

            if self.check_ident("table") {
                self.advance();
                doc.tables.push(self.parse_table(&mut doc.refs)?);
            } else if self.check_ident("ref") {
                self.advance();
                doc.refs.extend(self.parse_ref()?);
            } else if self.check_ident("enum") {
                self.advance();
                doc.enums.push(self.parse_enum()?);
            } else if let Token::Ident(kind) = self.peek().clone() {
                // Project, TableGroup, Note, TablePartial, ...
                self.advance();
                self.skip_block()?;
                doc.skipped_blocks.push(kind);
            } else {
                return Err(self.unexpected("Table, Ref, Enum or another block"));
            }
        }
    }

    /// Skip a block header and its braced body, nested braces included
    fn skip_block(&mut self) -> Result<(), ParseError> {
        while !matches!(self.peek(), Token::LBrace | Token::Colon | Token::Eof) {
            self.advance();
        }
        if *self.peek() == Token::Colon {
            // short form `Note: '...'`
            self.advance();
            self.advance();
            return Ok(());
        }
        self.expect(Token::LBrace, "'{'")?;
        let mut depth = 1;
        while depth > 0 {
            match self.advance() {
                Token::LBrace => depth += 1,
                Token::RBrace => depth -= 1,
                Token::Eof => return Err(self.unexpected("'}'")),
                _ => {}
            }
        }
        Ok(())
    }

    /// `[schema.]name`
    fn parse_qualified_name(&mut self) -> Result<(Option<String>, String), ParseError> {
        let first = self.expect_name()?;
        if *self.peek() == Token::Dot {
            self.advance();
            let second = self.expect_name()?;
            Ok((Some(first), second))
        } else {
            Ok((None, first))
        }
    }

    fn parse_table(&mut self, refs: &mut Vec<RefDecl>) -> Result<TableDecl, ParseError> {
        let line = self.line();
        let (schema, name) = self.parse_qualified_name()?;
        let mut table = TableDecl {
            schema,
            name,
            line,
            ..Default::default()
        };

        if self.check_ident("as") {
            self.advance();
            table.alias = Some(self.expect_name()?);
        }
        if *self.peek() == Token::LBracket {
            for (key, value) in self.parse_settings()? {
                if key.eq_ignore_ascii_case("note") {
                    table.note = value;
                }
            }
        }
        self.expect(Token::LBrace, "'{'")?;

        loop {
            self.skip_newlines();
            match self.peek().clone() {
                Token::RBrace => {
                    self.advance();
                    return Ok(table);
                }
                Token::Ident(word) if word.eq_ignore_ascii_case("indexes") && *self.peek_at(1) == Token::LBrace => {
                    self.advance();
                    table.indexes.extend(self.parse_indexes()?);
                }
                Token::Ident(word) if word.eq_ignore_ascii_case("note") && *self.peek_at(1) == Token::Colon => {
                    self.advance();
                    self.advance();
                    table.note = Some(self.expect_name()?);
                }
                Token::Ident(word) if word.eq_ignore_ascii_case("note") && *self.peek_at(1) == Token::LBrace => {
                    self.advance();
                    self.advance();
                    self.skip_newlines();
                    table.note = Some(self.expect_name()?);
                    self.skip_newlines();
                    self.expect(Token::RBrace, "'}'")?;
                }
                Token::Eof => return Err(self.unexpected("'}'")),
                _ => {
                    let column = self.parse_column()?;
                    let source = Endpoint {
                        schema: table.schema.clone(),
                        table: table.name.clone(),
                        columns: vec![column.name.clone()],
                    };
                    for inline in &column.settings.refs {
                        refs.push(RefDecl {
                            name: None,
                            left: source.clone(),
                            op: inline.op,
                            right: inline.target.clone(),
                            line: column.line,
                        });
                    }
                    table.columns.push(column);
                }
            }
        }
    }

    fn parse_column(&mut self) -> Result<ColumnDecl, ParseError> {
        let line = self.line();
        let name = self.expect_name()?;

        let mut type_name = self.expect_name()?;
        if *self.peek() == Token::Dot {
            self.advance();
            type_name = format!("{}.{}", type_name, self.expect_name()?);
        }
        if *self.peek() == Token::LParen {
            self.advance();
            let mut args = Vec::new();
            while *self.peek() != Token::RParen {
                match self.advance() {
                    Token::Num(n) | Token::Ident(n) => args.push(n),
                    Token::Str(s) => args.push(format!("'{}'", s)),
                    Token::Comma => {}
                    _ => {
                        self.pos -= 1;
                        return Err(self.unexpected("type argument"));
                    }
                }
            }
            self.advance();
            type_name = format!("{}({})", type_name, args.join(","));
        }

        let mut is_array = false;
        while *self.peek() == Token::LBracket && *self.peek_at(1) == Token::RBracket {
            self.advance();
            self.advance();
            is_array = true;
        }

        let mut settings = ColumnSettings::default();
        if *self.peek() == Token::LBracket {
            settings = self.parse_column_settings()?;
        }
        if !self.at_line_end() {
            return Err(self.unexpected("end of column definition"));
        }

        Ok(ColumnDecl {
            name,
            type_name,
            is_array,
            settings,
            line,
        })
    }

    fn parse_column_settings(&mut self) -> Result<ColumnSettings, ParseError> {
        self.expect(Token::LBracket, "'['")?;
        let mut settings = ColumnSettings::default();

        loop {
            self.skip_newlines();
            match self.peek().clone() {
                Token::RBracket => {
                    self.advance();
                    return Ok(settings);
                }
                Token::Comma => {
                    self.advance();
                }
                Token::Ident(word) => {
                    self.advance();
                    match word.to_ascii_lowercase().as_str() {
                        "pk" => settings.primary_key = true,
                        "primary" if self.check_ident("key") => {
                            self.advance();
                            settings.primary_key = true;
                        }
                        "not" if self.check_ident("null") => {
                            self.advance();
                            settings.nullable = Some(false);
                        }
                        "null" => settings.nullable = Some(true),
                        "unique" => settings.unique = true,
                        "increment" => settings.increment = true,
                        "default" => {
                            self.expect(Token::Colon, "':'")?;
                            settings.default = Some(self.parse_value()?);
                        }
                        "note" => {
                            self.expect(Token::Colon, "':'")?;
                            settings.note = Some(self.expect_name()?);
                        }
                        "ref" => {
                            self.expect(Token::Colon, "':'")?;
                            let op = self.parse_ref_op()?;
                            let target = self.parse_endpoint()?;
                            settings.refs.push(InlineRef { op, target });
                        }
                        _ => self.skip_setting_value(),
                    }
                }
                _ => return Err(self.unexpected("column setting")),
            }
        }
    }

    /// Default value as it should appear in the model
    fn parse_value(&mut self) -> Result<String, ParseError> {
        match self.advance() {
            Token::Str(s) => Ok(format!("'{}'", s.replace('\'', "''"))),
            Token::Num(n) => Ok(n),
            Token::Expr(e) => Ok(e),
            Token::Ident(i) => Ok(i),
            _ => {
                self.pos -= 1;
                Err(self.unexpected("default value"))
            }
        }
    }

    /// Unknown `key: value` setting; the value is skipped
    fn skip_setting_value(&mut self) {
        if *self.peek() == Token::Colon {
            self.advance();
            while !matches!(self.peek(), Token::Comma | Token::RBracket | Token::Eof) {
                self.advance();
            }
        }
    }

    /// Generic `[key: value, flag]` list; values are plain strings
    fn parse_settings(&mut self) -> Result<Vec<(String, Option<String>)>, ParseError> {
        self.expect(Token::LBracket, "'['")?;
        let mut settings = Vec::new();
        loop {
            self.skip_newlines();
            match self.advance() {
                Token::RBracket => return Ok(settings),
                Token::Comma => {}
                Token::Ident(key) => {
                    let mut words = vec![key];
                    while let Token::Ident(next) = self.peek().clone() {
                        self.advance();
                        words.push(next);
                    }
                    let value = if *self.peek() == Token::Colon {
                        self.advance();
                        Some(match self.advance() {
                            Token::Ident(v) | Token::Str(v) | Token::Num(v) | Token::Expr(v) => v,
                            _ => {
                                self.pos -= 1;
                                return Err(self.unexpected("setting value"));
                            }
                        })
                    } else {
                        None
                    };
                    settings.push((words.join(" "), value));
                }
                _ => {
                    self.pos -= 1;
                    return Err(self.unexpected("setting"));
                }
            }
        }
    }

    fn parse_indexes(&mut self) -> Result<Vec<IndexDecl>, ParseError> {
        self.expect(Token::LBrace, "'{'")?;
        let mut indexes = Vec::new();
        loop {
            self.skip_newlines();
            match self.peek().clone() {
                Token::RBrace => {
                    self.advance();
                    return Ok(indexes);
                }
                Token::LParen => {
                    self.advance();
                    let mut parts = Vec::new();
                    while *self.peek() != Token::RParen {
                        match self.advance() {
                            Token::Ident(c) | Token::Str(c) => parts.push(IndexPart::Column(c)),
                            Token::Expr(e) => parts.push(IndexPart::Expression(e)),
                            Token::Comma => {}
                            _ => {
                                self.pos -= 1;
                                return Err(self.unexpected("index column"));
                            }
                        }
                    }
                    self.advance();
                    indexes.push(self.parse_index_settings(parts)?);
                }
                Token::Ident(c) | Token::Str(c) => {
                    self.advance();
                    indexes.push(self.parse_index_settings(vec![IndexPart::Column(c)])?);
                }
                Token::Expr(e) => {
                    self.advance();
                    indexes.push(self.parse_index_settings(vec![IndexPart::Expression(e)])?);
                }
                _ => return Err(self.unexpected("index definition")),
            }
        }
    }

    fn parse_index_settings(&mut self, parts: Vec<IndexPart>) -> Result<IndexDecl, ParseError> {
        let mut index = IndexDecl {
            parts,
            ..Default::default()
        };
        if *self.peek() == Token::LBracket {
            for (key, value) in self.parse_settings()? {
                match key.to_ascii_lowercase().as_str() {
                    "pk" | "primary key" => index.primary_key = true,
                    "unique" => index.unique = true,
                    "name" => index.name = value,
                    "type" => index.index_type = value.map(|v| v.to_lowercase()),
                    _ => {}
                }
            }
        }
        Ok(index)
    }

    fn parse_ref_op(&mut self) -> Result<RefOp, ParseError> {
        let op = match self.peek() {
            Token::Gt => RefOp::ManyToOne,
            Token::Lt => RefOp::OneToMany,
            Token::Minus => RefOp::OneToOne,
            Token::LtGt => RefOp::ManyToMany,
            _ => return Err(self.unexpected("one of '>', '<', '-', '<>'")),
        };
        self.advance();
        Ok(op)
    }

    /// `[schema.]table.column` or `[schema.]table.(c1, c2)`
    fn parse_endpoint(&mut self) -> Result<Endpoint, ParseError> {
        let mut names = vec![self.expect_name()?];
        let mut columns = Vec::new();

        while *self.peek() == Token::Dot {
            self.advance();
            if *self.peek() == Token::LParen {
                self.advance();
                while *self.peek() != Token::RParen {
                    match self.advance() {
                        Token::Ident(c) | Token::Str(c) => columns.push(c),
                        Token::Comma => {}
                        _ => {
                            self.pos -= 1;
                            return Err(self.unexpected("column name"));
                        }
                    }
                }
                self.advance();
                break;
            }
            names.push(self.expect_name()?);
        }

        if columns.is_empty() {
            if names.len() < 2 {
                return Err(self.unexpected("'.' and a column name"));
            }
            columns.push(names.pop().unwrap_or_default());
        }
        let table = names.pop().unwrap_or_default();
        Ok(Endpoint {
            schema: names.pop(),
            table,
            columns,
        })
    }

    /// `Ref [name]: a > b` or `Ref [name] { a > b ... }`
    fn parse_ref(&mut self) -> Result<Vec<RefDecl>, ParseError> {
        let name = match self.peek().clone() {
            Token::Ident(n) | Token::Str(n) => {
                self.advance();
                Some(n)
            }
            _ => None,
        };

        if *self.peek() == Token::Colon {
            self.advance();
            let decl = self.parse_ref_body(name)?;
            if *self.peek() == Token::LBracket {
                self.parse_settings()?;
            }
            return Ok(vec![decl]);
        }

        self.expect(Token::LBrace, "':' or '{'")?;
        let mut refs = Vec::new();
        loop {
            self.skip_newlines();
            if *self.peek() == Token::RBrace {
                self.advance();
                return Ok(refs);
            }
            refs.push(self.parse_ref_body(name.clone())?);
            if *self.peek() == Token::LBracket {
                self.parse_settings()?;
            }
        }
    }

    fn parse_ref_body(&mut self, name: Option<String>) -> Result<RefDecl, ParseError> {
        let line = self.line();
        let left = self.parse_endpoint()?;
        let op = self.parse_ref_op()?;
        let right = self.parse_endpoint()?;
        Ok(RefDecl {
            name,
            left,
            op,
            right,
            line,
        })
    }

    fn parse_enum(&mut self) -> Result<EnumDecl, ParseError> {
        let (schema, name) = self.parse_qualified_name()?;
        self.expect(Token::LBrace, "'{'")?;
        let mut values = Vec::new();
        loop {
            self.skip_newlines();
            match self.peek().clone() {
                Token::RBrace => {
                    self.advance();
                    return Ok(EnumDecl { schema, name, values });
                }
                Token::Ident(v) | Token::Str(v) | Token::Num(v) => {
                    self.advance();
                    values.push(v);
                    if *self.peek() == Token::LBracket {
                        self.parse_settings()?;
                    }
                }
                _ => return Err(self.unexpected("enum value")),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Document {
        Parser::new(input).unwrap().parse().unwrap()
    }

    #[test]
    fn test_table_with_settings() {
        let doc = parse(
            r#"
            Table app.users as U [headercolor: #3498DB, note: 'People'] {
              id integer [pk, increment]
              email varchar(255) [not null, unique, note: "login"]
              score decimal(10, 2) [default: 0]
              tags text[]
              status "user status" [default: 'active']
            }
            "#,
        );
        let users = &doc.tables[0];
        assert_eq!(users.schema.as_deref(), Some("app"));
        assert_eq!(users.alias.as_deref(), Some("U"));
        assert_eq!(users.note.as_deref(), Some("People"));
        assert_eq!(users.columns.len(), 5);

        assert!(users.columns[0].settings.primary_key && users.columns[0].settings.increment);
        assert_eq!(users.columns[1].type_name, "varchar(255)");
        assert_eq!(users.columns[1].settings.nullable, Some(false));
        assert_eq!(users.columns[2].type_name, "decimal(10,2)");
        assert_eq!(users.columns[2].settings.default.as_deref(), Some("0"));
        assert!(users.columns[3].is_array);
        assert_eq!(users.columns[4].type_name, "user status");
        assert_eq!(users.columns[4].settings.default.as_deref(), Some("'active'"));
    }

    #[test]
    fn test_refs_all_forms() {
        let doc = parse(
            r#"
            Table posts {
              id int
              author_id int [ref: > users.id]
            }
            Ref: comments.post_id > posts.id
            Ref fk_pair {
              a.(x, y) < b.(x, y)
              a.id - c.id
            }
            Ref: tags.id <> posts.id [delete: cascade]
            "#,
        );
        assert_eq!(doc.refs.len(), 5);
        assert_eq!(doc.refs[0].left.table, "posts");
        assert_eq!(doc.refs[0].right.table, "users");
        assert_eq!(doc.refs[0].op, RefOp::ManyToOne);
        assert_eq!(doc.refs[2].left.columns, vec!["x", "y"]);
        assert_eq!(doc.refs[2].name.as_deref(), Some("fk_pair"));
        assert_eq!(doc.refs[3].op, RefOp::OneToOne);
        assert_eq!(doc.refs[4].op, RefOp::ManyToMany);
    }

    #[test]
    fn test_indexes_block() {
        let doc = parse(
            r#"
            Table orders {
              id int
              user_id int
              created_at timestamp
              indexes {
                (user_id, created_at) [name: 'idx_user_created', unique]
                created_at [type: hash]
                `lower(note)`
                (id) [pk]
              }
            }
            "#,
        );
        let indexes = &doc.tables[0].indexes;
        assert_eq!(indexes.len(), 4);
        assert!(indexes[0].unique);
        assert_eq!(indexes[0].name.as_deref(), Some("idx_user_created"));
        assert_eq!(indexes[1].index_type.as_deref(), Some("hash"));
        assert!(matches!(indexes[2].parts[0], IndexPart::Expression(_)));
        assert!(indexes[3].primary_key);
    }

    #[test]
    fn test_enums_and_ignored_blocks() {
        let doc = parse(
            r#"
            Project shop { database_type: 'PostgreSQL' }
            Enum order_status {
              created [note: 'new']
              "in progress"
              done
            }
            TableGroup core { orders }
            Note overview { 'Just text' }
            "#,
        );
        assert_eq!(doc.enums[0].values, vec!["created", "in progress", "done"]);
        assert_eq!(doc.skipped_blocks, vec!["Project", "TableGroup", "Note"]);
    }

    #[test]
    fn test_error_position() {
        let err = Parser::new("Table t {\n  id int [pk\n}").unwrap().parse().unwrap_err();
        assert_eq!(err.position().0, 3);
    }
}
