//! 正規表現のパーサ。
//!
//! `/body/flags` 形式のリテラルと、本体だけの式の両方を受け付ける。
//!
//! ```text
//! disjunction := alternative ('|' alternative)*
//! alternative := term*
//! term        := assertion | atom quantifier?
//! atom        := '.' | escape | class | group | char
//! quantifier  := ('*' | '+' | '?' | '{' n (',' m?)? '}') '?'?
//! ```
use super::ast::*;
use log::trace;
use std::{
    collections::HashMap,
    error::Error,
    fmt::{self, Display},
};

/// 閉じスラッシュの後に書けるフラグ。
pub const FLAGS: &str = "dgimsuvyx";

/// グループと先読み・後読みの入れ子の深さの上限。
pub const MAX_NESTING: usize = 128;

/// ひとつの選択に書ける枝の数の上限。
pub const MAX_BRANCHES: usize = 1024;

/// パースエラー。位置は入力全体における文字単位のオフセット。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    InvalidEscape(usize),
    InvalidRightParen(usize),
    NoRightParen(usize),
    NoRightBracket(usize),
    NothingToRepeat(usize),
    InvalidQuantifier(usize),
    InvalidClassRange(usize),
    InvalidGroup(usize),
    InvalidGroupName(usize),
    UnknownGroupName(usize, String),
    InvalidFlag(usize, char),
    DuplicateFlag(usize, char),
    NestingTooDeep(usize),
    TooManyBranches(usize),
}

impl Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::InvalidEscape(pos) => write!(f, "ParseError: invalid escape: pos = {pos}"),
            ParseError::InvalidRightParen(pos) => {
                write!(f, "ParseError: invalid right parenthesis: pos = {pos}")
            }
            ParseError::NoRightParen(pos) => {
                write!(f, "ParseError: no right parenthesis for group at pos = {pos}")
            }
            ParseError::NoRightBracket(pos) => {
                write!(f, "ParseError: no right bracket for class at pos = {pos}")
            }
            ParseError::NothingToRepeat(pos) => write!(f, "ParseError: nothing to repeat: pos = {pos}"),
            ParseError::InvalidQuantifier(pos) => {
                write!(f, "ParseError: numbers out of order in quantifier: pos = {pos}")
            }
            ParseError::InvalidClassRange(pos) => {
                write!(f, "ParseError: invalid character class range: pos = {pos}")
            }
            ParseError::InvalidGroup(pos) => write!(f, "ParseError: invalid group: pos = {pos}"),
            ParseError::InvalidGroupName(pos) => {
                write!(f, "ParseError: invalid capture group name: pos = {pos}")
            }
            ParseError::UnknownGroupName(pos, name) => {
                write!(f, "ParseError: unknown group name '{name}': pos = {pos}")
            }
            ParseError::InvalidFlag(pos, c) => {
                write!(f, "ParseError: invalid flag: pos = {pos}, flag = '{c}'")
            }
            ParseError::DuplicateFlag(pos, c) => {
                write!(f, "ParseError: duplicate flag: pos = {pos}, flag = '{c}'")
            }
            ParseError::NestingTooDeep(pos) => {
                write!(f, "ParseError: groups nested deeper than {MAX_NESTING}: pos = {pos}")
            }
            ParseError::TooManyBranches(pos) => {
                write!(f, "ParseError: more than {MAX_BRANCHES} alternatives: pos = {pos}")
            }
        }
    }
}

impl Error for ParseError {}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// すべてのノードに `loc` を付ける。
    pub capture_locations: bool,
}

/// 正規表現をパースして AST を返す。
pub fn parse(expr: &str, options: ParseOptions) -> Result<RegExp, ParseError> {
    let chars: Vec<char> = expr.chars().collect();
    let (body_start, body_end, flags) = split_literal(&chars)?;
    trace!("parse: body = {body_start}..{body_end}, flags = {flags:?}");

    let mut parser = Parser::new(&chars, body_start, body_end, options, flags.contains('x'));
    let body = parser.parse_body()?;
    let loc = parser.loc(0, chars.len());
    Ok(RegExp { body, flags, loc })
}

/// `/body/flags` を本体の範囲と検査済みのフラグに分ける。
fn split_literal(chars: &[char]) -> Result<(usize, usize, String), ParseError> {
    let last = match chars.iter().rposition(|&c| c == '/') {
        Some(last) if last > 0 && chars[0] == '/' => last,
        _ => return Ok((0, chars.len(), String::new())),
    };

    let mut flags = String::new();
    for (i, &c) in chars[last + 1..].iter().enumerate() {
        let pos = last + 1 + i;
        if !FLAGS.contains(c) {
            return Err(ParseError::InvalidFlag(pos, c));
        }
        if flags.contains(c) {
            return Err(ParseError::DuplicateFlag(pos, c));
        }
        flags.push(c);
    }
    Ok((1, last, flags))
}

struct Parser<'a> {
    chars: &'a [char],
    pos: usize,
    end: usize,
    options: ParseOptions,
    extended: bool,
    group_count: usize,
    total_groups: usize,
    group_names: HashMap<String, usize>,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(
        chars: &'a [char],
        start: usize,
        end: usize,
        options: ParseOptions,
        extended: bool,
    ) -> Self {
        let mut parser = Parser {
            chars,
            pos: start,
            end,
            options,
            extended,
            group_count: 0,
            total_groups: 0,
            group_names: HashMap::new(),
            depth: 0,
        };
        parser.scan_groups();
        parser
    }

    /// `\N` が後方参照か 8 進エスケープかを判定するため、キャプチャグループを先に数える。
    fn scan_groups(&mut self) {
        let mut i = self.pos;
        let mut in_class = false;
        while i < self.end {
            match self.chars[i] {
                '\\' => i += 1,
                '[' => in_class = true,
                ']' => in_class = false,
                '(' if !in_class => {
                    if self.char_at(i + 1) != Some('?') {
                        self.total_groups += 1;
                    } else if self.char_at(i + 2) == Some('<')
                        && !matches!(self.char_at(i + 3), Some('=') | Some('!'))
                    {
                        self.total_groups += 1;
                        let name: String = self.chars[i + 3..self.end]
                            .iter()
                            .take_while(|&&c| c != '>')
                            .collect();
                        self.group_names.insert(name, self.total_groups);
                    }
                }
                _ => (),
            }
            i += 1;
        }
    }

    fn char_at(&self, i: usize) -> Option<char> {
        if i < self.end {
            Some(self.chars[i])
        } else {
            None
        }
    }

    fn peek(&self) -> Option<char> {
        self.char_at(self.pos)
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.char_at(self.pos + n)
    }

    fn starts_with(&self, s: &str) -> bool {
        s.chars().enumerate().all(|(i, c)| self.peek_at(i) == Some(c))
    }

    fn slice(&self, start: usize, end: usize) -> String {
        self.chars[start..end].iter().collect()
    }

    fn position(&self, offset: usize) -> Position {
        let before = &self.chars[..offset];
        let line = 1 + before.iter().filter(|&&c| c == '\n').count();
        let column = before.iter().rev().take_while(|&&c| c != '\n').count();
        Position {
            offset,
            line,
            column,
        }
    }

    fn loc(&self, start: usize, end: usize) -> Option<Loc> {
        if !self.options.capture_locations {
            return None;
        }
        Some(Loc {
            source: self.slice(start, end),
            start: self.position(start),
            end: self.position(end),
        })
    }

    fn with_loc(&self, mut c: Char, start: usize) -> Char {
        c.loc = self.loc(start, self.pos);
        c
    }

    /// `x` フラグのもとで空白と `#` コメントを読み飛ばす。
    fn skip_extended(&mut self) {
        if !self.extended {
            return;
        }
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.pos += 1;
            } else if c == '#' {
                while let Some(c) = self.peek() {
                    self.pos += 1;
                    if c == '\n' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    fn expect_right_paren(&mut self, open: usize) -> Result<(), ParseError> {
        if self.peek() == Some(')') {
            self.pos += 1;
            Ok(())
        } else {
            Err(ParseError::NoRightParen(open))
        }
    }

    /// `open` で開いたグループまたは先読み・後読みの中身。
    fn parse_nested(&mut self, open: usize) -> Result<Option<Node>, ParseError> {
        if self.depth >= MAX_NESTING {
            return Err(ParseError::NestingTooDeep(open));
        }
        self.depth += 1;
        let body = self.parse_disjunction();
        self.depth -= 1;
        body
    }

    fn parse_body(&mut self) -> Result<Option<Node>, ParseError> {
        let body = self.parse_disjunction()?;
        if self.pos < self.end {
            // トップレベルの選択を途中で止めるのは対応のない ')' だけ
            return Err(ParseError::InvalidRightParen(self.pos));
        }
        Ok(body)
    }

    fn parse_disjunction(&mut self) -> Result<Option<Node>, ParseError> {
        let start = self.pos;
        let mut node = self.parse_alternative()?;
        let mut branches = 1;
        while self.peek() == Some('|') {
            branches += 1;
            if branches > MAX_BRANCHES {
                return Err(ParseError::TooManyBranches(self.pos));
            }
            self.pos += 1;
            let right = self.parse_alternative()?;
            node = Some(Node::Disjunction {
                left: node.map(Box::new),
                right: right.map(Box::new),
                loc: self.loc(start, self.pos),
            });
        }
        Ok(node)
    }

    fn parse_alternative(&mut self) -> Result<Option<Node>, ParseError> {
        let start = self.pos;
        let mut terms = Vec::new();
        loop {
            self.skip_extended();
            match self.peek() {
                None | Some('|') | Some(')') => break,
                _ => terms.push(self.parse_term()?),
            }
        }

        Ok(match terms.len() {
            0 => None,
            1 => terms.pop(),
            _ => Some(Node::Alternative {
                expressions: terms,
                loc: self.loc(start, self.pos),
            }),
        })
    }

    fn parse_term(&mut self) -> Result<Node, ParseError> {
        let start = self.pos;
        if let Some(assertion) = self.parse_assertion()? {
            if self.scan_quantifier()?.is_some() {
                return Err(ParseError::NothingToRepeat(self.pos));
            }
            return Ok(assertion);
        }

        let atom = self.parse_atom()?;
        self.parse_quantifier(atom, start)
    }

    fn parse_assertion(&mut self) -> Result<Option<Node>, ParseError> {
        let start = self.pos;
        let simple = match (self.peek(), self.peek_at(1)) {
            (Some('^'), _) => Some((AssertionKind::Start, 1)),
            (Some('$'), _) => Some((AssertionKind::End, 1)),
            (Some('\\'), Some('b')) => Some((AssertionKind::WordBoundary, 2)),
            (Some('\\'), Some('B')) => Some((AssertionKind::NonWordBoundary, 2)),
            _ => None,
        };
        if let Some((kind, len)) = simple {
            self.pos += len;
            return Ok(Some(Node::Assertion {
                kind,
                negative: false,
                assertion: None,
                loc: self.loc(start, self.pos),
            }));
        }

        let lookaround = [
            ("(?=", AssertionKind::Lookahead, false),
            ("(?!", AssertionKind::Lookahead, true),
            ("(?<=", AssertionKind::Lookbehind, false),
            ("(?<!", AssertionKind::Lookbehind, true),
        ]
        .into_iter()
        .find(|(open, _, _)| self.starts_with(open));

        let Some((open, kind, negative)) = lookaround else {
            return Ok(None);
        };
        self.pos += open.chars().count();
        let assertion = self.parse_nested(start)?;
        self.expect_right_paren(start)?;

        Ok(Some(Node::Assertion {
            kind,
            negative,
            assertion: assertion.map(Box::new),
            loc: self.loc(start, self.pos),
        }))
    }

    fn parse_atom(&mut self) -> Result<Node, ParseError> {
        let start = self.pos;
        let c = self.peek().ok_or(ParseError::NothingToRepeat(start))?;
        match c {
            '(' => self.parse_group(),
            '[' => self.parse_class(),
            '\\' => self.parse_escape(),
            '*' | '+' | '?' => Err(ParseError::NothingToRepeat(start)),
            '{' if self.scan_quantifier()?.is_some() => Err(ParseError::NothingToRepeat(start)),
            '.' => {
                self.pos += 1;
                Ok(Node::Char(self.with_loc(Char::meta(".", None), start)))
            }
            c => {
                self.pos += 1;
                Ok(Node::Char(self.with_loc(Char::simple(c), start)))
            }
        }
    }

    fn parse_quantifier(&mut self, atom: Node, start: usize) -> Result<Node, ParseError> {
        let Some((mut quantifier, end)) = self.scan_quantifier()? else {
            return Ok(atom);
        };
        quantifier.loc = self.loc(self.pos, end);
        self.pos = end;

        if self.scan_quantifier()?.is_some() {
            return Err(ParseError::NothingToRepeat(self.pos));
        }

        Ok(Node::Repetition {
            expression: Box::new(atom),
            quantifier,
            loc: self.loc(start, self.pos),
        })
    }

    /// 現在位置の量指定子を読む。位置は進めない。
    ///
    /// 範囲として正しくない `{` はただの文字とする。
    fn scan_quantifier(&self) -> Result<Option<(Quantifier, usize)>, ParseError> {
        let mut i = self.pos;
        let (kind, from, to) = match self.char_at(i) {
            Some('*') => (QuantifierKind::Star, None, None),
            Some('+') => (QuantifierKind::Plus, None, None),
            Some('?') => (QuantifierKind::Question, None, None),
            Some('{') => {
                let mut j = i + 1;
                let Some(from) = self.digits_at(&mut j) else {
                    return Ok(None);
                };
                let to = if self.char_at(j) == Some(',') {
                    j += 1;
                    self.digits_at(&mut j)
                } else {
                    Some(from)
                };
                if self.char_at(j) != Some('}') {
                    return Ok(None);
                }
                if to.is_some_and(|to| to < from) {
                    return Err(ParseError::InvalidQuantifier(i));
                }
                i = j;
                (QuantifierKind::Range, Some(from), to)
            }
            _ => return Ok(None),
        };
        i += 1;

        let greedy = if self.char_at(i) == Some('?') {
            i += 1;
            false
        } else {
            true
        };

        Ok(Some((
            Quantifier {
                kind,
                from,
                to,
                greedy,
                loc: None,
            },
            i,
        )))
    }

    fn digits_at(&self, i: &mut usize) -> Option<usize> {
        let start = *i;
        while self.char_at(*i).is_some_and(|c| c.is_ascii_digit()) {
            *i += 1;
        }
        self.slice(start, *i).parse().ok()
    }

    fn parse_group(&mut self) -> Result<Node, ParseError> {
        let start = self.pos;
        self.pos += 1;

        let (capturing, name) = if self.starts_with("?:") {
            self.pos += 2;
            (false, None)
        } else if self.starts_with("?<") {
            self.pos += 2;
            (true, Some(self.parse_group_name()?))
        } else if self.peek() == Some('?') {
            return Err(ParseError::InvalidGroup(start));
        } else {
            (true, None)
        };

        let number = if capturing {
            self.group_count += 1;
            Some(self.group_count)
        } else {
            None
        };

        let expression = self.parse_nested(start)?;
        self.expect_right_paren(start)?;

        Ok(Node::Group {
            capturing,
            number,
            name,
            expression: expression.map(Box::new),
            loc: self.loc(start, self.pos),
        })
    }

    /// `(?<` や `\k<` に続く `name>` を読む。
    fn parse_group_name(&mut self) -> Result<String, ParseError> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '$')
        {
            self.pos += 1;
        }
        let name = self.slice(start, self.pos);
        let starts_with_digit = name.starts_with(|c: char| c.is_ascii_digit());
        if name.is_empty() || starts_with_digit || self.peek() != Some('>') {
            return Err(ParseError::InvalidGroupName(start));
        }
        self.pos += 1;
        Ok(name)
    }

    fn parse_escape(&mut self) -> Result<Node, ParseError> {
        let start = self.pos;
        self.pos += 1;
        match self.peek() {
            Some('1'..='9') => {
                let mut end = self.pos;
                let number = self.digits_at(&mut end).unwrap_or(usize::MAX);
                if number <= self.total_groups {
                    let reference = self.slice(self.pos, end);
                    self.pos = end;
                    Ok(Node::Backreference {
                        kind: BackreferenceKind::Number,
                        number,
                        reference,
                        loc: self.loc(start, self.pos),
                    })
                } else {
                    let c = self.parse_char_escape(start, false)?;
                    Ok(Node::Char(c))
                }
            }
            Some('k') if self.peek_at(1) == Some('<') && !self.group_names.is_empty() => {
                self.pos += 2;
                let name_start = self.pos;
                let name = self.parse_group_name()?;
                let number = *self
                    .group_names
                    .get(&name)
                    .ok_or_else(|| ParseError::UnknownGroupName(name_start, name.clone()))?;
                Ok(Node::Backreference {
                    kind: BackreferenceKind::Name,
                    number,
                    reference: name,
                    loc: self.loc(start, self.pos),
                })
            }
            _ => {
                let c = self.parse_char_escape(start, false)?;
                Ok(Node::Char(c))
            }
        }
    }

    /// `start` のバックスラッシュに続くエスケープを読む。
    fn parse_char_escape(&mut self, start: usize, in_class: bool) -> Result<Char, ParseError> {
        let c = self.peek().ok_or(ParseError::InvalidEscape(start))?;
        self.pos += 1;

        let escaped = match c {
            'd' | 'D' | 'w' | 'W' | 's' | 'S' => Char::meta(&format!("\\{c}"), None),
            'n' => Char::meta("\\n", Some('\n')),
            't' => Char::meta("\\t", Some('\t')),
            'r' => Char::meta("\\r", Some('\r')),
            'f' => Char::meta("\\f", Some('\u{c}')),
            'v' => Char::meta("\\v", Some('\u{b}')),
            'b' if in_class => Char::meta("\\b", Some('\u{8}')),
            '0' if !self.peek().is_some_and(|c| c.is_ascii_digit()) => {
                self.coded(CharKind::Decimal, start, 0)
            }
            '0'..='7' => {
                self.pos -= 1;
                let digits_start = self.pos;
                while self.pos - digits_start < 3 && self.peek().is_some_and(|c| ('0'..='7').contains(&c)) {
                    self.pos += 1;
                }
                let code = u32::from_str_radix(&self.slice(digits_start, self.pos), 8)
                    .map_err(|_| ParseError::InvalidEscape(start))?;
                self.coded(CharKind::Oct, start, code)
            }
            'x' => {
                let code = self.hex_digits(2).ok_or(ParseError::InvalidEscape(start))?;
                self.coded(CharKind::Hex, start, code)
            }
            'u' => {
                let code = if self.peek() == Some('{') {
                    self.pos += 1;
                    let digits_start = self.pos;
                    while self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
                        self.pos += 1;
                    }
                    let code = u32::from_str_radix(&self.slice(digits_start, self.pos), 16).ok();
                    if self.peek() != Some('}') {
                        return Err(ParseError::InvalidEscape(start));
                    }
                    self.pos += 1;
                    code.filter(|&code| code <= 0x10FFFF)
                } else {
                    self.hex_digits(4)
                };
                let code = code.ok_or(ParseError::InvalidEscape(start))?;
                self.coded(CharKind::Unicode, start, code)
            }
            'c' => {
                let letter = self
                    .peek()
                    .filter(|c| c.is_ascii_alphabetic())
                    .ok_or(ParseError::InvalidEscape(start))?;
                self.pos += 1;
                self.coded(CharKind::Control, start, letter as u32 % 32)
            }
            c => Char::escaped(c),
        };
        Ok(self.with_loc(escaped, start))
    }

    fn hex_digits(&mut self, n: usize) -> Option<u32> {
        let digits: String = (0..n).map_while(|i| self.peek_at(i)).collect();
        if digits.chars().count() != n || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        self.pos += n;
        u32::from_str_radix(&digits, 16).ok()
    }

    /// 1 つのコードポイントを表すエスケープ。`value` は入力上の表記。
    fn coded(&self, kind: CharKind, start: usize, code: u32) -> Char {
        Char {
            value: self.slice(start, self.pos),
            kind,
            symbol: char::from_u32(code),
            code_point: Some(code),
            escaped: false,
            loc: None,
        }
    }

    fn parse_class(&mut self) -> Result<Node, ParseError> {
        let start = self.pos;
        self.pos += 1;
        let negative = if self.peek() == Some('^') {
            self.pos += 1;
            true
        } else {
            false
        };

        let mut expressions = Vec::new();
        loop {
            match self.peek() {
                None => return Err(ParseError::NoRightBracket(start)),
                Some(']') => {
                    self.pos += 1;
                    break;
                }
                Some(_) => {
                    let item_start = self.pos;
                    let from = self.parse_class_atom()?;
                    if self.peek() == Some('-') && self.peek_at(1).is_some_and(|c| c != ']') {
                        self.pos += 1;
                        let to = self.parse_class_atom()?;
                        match (from.code_point, to.code_point) {
                            (Some(lo), Some(hi)) if lo <= hi => (),
                            _ => return Err(ParseError::InvalidClassRange(item_start)),
                        }
                        expressions.push(Node::ClassRange {
                            from,
                            to,
                            loc: self.loc(item_start, self.pos),
                        });
                    } else {
                        expressions.push(Node::Char(from));
                    }
                }
            }
        }

        Ok(Node::CharacterClass {
            negative,
            expressions,
            loc: self.loc(start, self.pos),
        })
    }

    fn parse_class_atom(&mut self) -> Result<Char, ParseError> {
        let start = self.pos;
        let c = self.peek().ok_or(ParseError::NoRightBracket(start))?;
        self.pos += 1;
        if c == '\\' {
            self.parse_char_escape(start, true)
        } else {
            Ok(self.with_loc(Char::simple(c), start))
        }
    }
}
