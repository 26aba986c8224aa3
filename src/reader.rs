use crate::arena::Arena;
use crate::error::{SexprError, SexprResult};
use crate::value::Value;

/// Lexical categories. Atom text is everything up to whitespace or a
/// reserved character; there are no strings, floats, or comments.
#[derive(Debug, PartialEq, Eq)]
enum Token {
    LParen,
    RParen,
    Quote,
    Atom(String),
    End,
}

/// Recursive-descent reader: parses source text into arena-resident values.
pub struct Reader<'a> {
    input: &'a [u8],
    pos: usize,
    arena: &'a mut Arena,
}

impl<'a> Reader<'a> {
    pub fn new(input: &'a str, arena: &'a mut Arena) -> Self {
        Reader {
            input: input.as_bytes(),
            pos: 0,
            arena,
        }
    }

    /// Read one expression. Returns None at a clean end-of-input between
    /// top-level forms; end-of-input mid-expression is a parse error.
    pub fn read(&mut self) -> SexprResult<Option<Value>> {
        match self.next_token() {
            Token::End => Ok(None),
            token => Ok(Some(self.parse_expr(token)?)),
        }
    }

    /// Current byte offset in the input.
    pub fn position(&self) -> usize {
        self.pos
    }

    fn parse_expr(&mut self, token: Token) -> SexprResult<Value> {
        match token {
            Token::Atom(text) => self.arena.alloc_atom(&text),
            Token::LParen => self.parse_list(),
            Token::Quote => self.parse_quote(),
            Token::RParen => Err(SexprError::Parse("unexpected ')'".to_string())),
            Token::End => Err(SexprError::Parse(
                "unexpected end of input".to_string(),
            )),
        }
    }

    /// Parse elements after a '(' until the matching ')'. An immediate
    /// ')' yields Nil.
    fn parse_list(&mut self) -> SexprResult<Value> {
        let mut elements = Vec::new();
        loop {
            match self.next_token() {
                Token::RParen => break,
                Token::End => {
                    return Err(SexprError::Parse("unterminated list".to_string()));
                }
                token => elements.push(self.parse_expr(token)?),
            }
        }

        let mut result = Value::Nil;
        for val in elements.into_iter().rev() {
            result = self.arena.alloc_pair(val, result)?;
        }
        Ok(result)
    }

    /// 'expr desugars to (quote expr).
    fn parse_quote(&mut self) -> SexprResult<Value> {
        let token = self.next_token();
        if token == Token::End {
            return Err(SexprError::Parse(
                "end of input after quote".to_string(),
            ));
        }
        let expr = self.parse_expr(token)?;
        let quote = self.arena.alloc_atom("quote")?;
        let inner = self.arena.alloc_pair(expr, Value::Nil)?;
        self.arena.alloc_pair(quote, inner)
    }

    fn next_token(&mut self) -> Token {
        while self.pos < self.input.len() && self.input[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
        if self.pos >= self.input.len() {
            return Token::End;
        }

        let ch = self.input[self.pos];
        self.pos += 1;
        match ch {
            b'(' => Token::LParen,
            b')' => Token::RParen,
            b'\'' => Token::Quote,
            _ => {
                let start = self.pos - 1;
                while self.pos < self.input.len()
                    && !is_reserved(self.input[self.pos])
                    && !self.input[self.pos].is_ascii_whitespace()
                {
                    self.pos += 1;
                }
                let text = String::from_utf8_lossy(&self.input[start..self.pos]).into_owned();
                Token::Atom(text)
            }
        }
    }
}

fn is_reserved(ch: u8) -> bool {
    ch == b'(' || ch == b')' || ch == b'\''
}

/// Read a single expression from a string.
pub fn read_str(input: &str, arena: &mut Arena) -> SexprResult<Value> {
    let mut reader = Reader::new(input, arena);
    reader
        .read()?
        .ok_or_else(|| SexprError::Parse("empty input".to_string()))
}

/// Read one expression starting at byte offset `pos`.
/// Returns `Ok(Some((value, new_pos)))` or `Ok(None)` if only whitespace remains.
pub fn read_one_at(
    input: &str,
    pos: usize,
    arena: &mut Arena,
) -> SexprResult<Option<(Value, usize)>> {
    let mut reader = Reader::new(&input[pos..], arena);
    match reader.read()? {
        Some(val) => Ok(Some((val, pos + reader.position()))),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_parens_are_nil() {
        let mut arena = Arena::new(64);
        assert_eq!(read_str("()", &mut arena), Ok(Value::Nil));
        assert_eq!(read_str("( )", &mut arena), Ok(Value::Nil));
    }

    #[test]
    fn atoms_end_at_reserved_characters() {
        let mut arena = Arena::new(64);
        let val = read_str("foo(", &mut arena).unwrap();
        let id = val.as_atom().unwrap();
        assert_eq!(arena.atom_text(id), "foo");
    }

    #[test]
    fn quote_sugar_desugars() {
        let mut arena = Arena::new(64);
        let val = read_str("'x", &mut arena).unwrap();
        // (quote . (x . ()))
        let outer = val.as_pair().unwrap();
        let head = arena.car(outer).as_atom().unwrap();
        assert_eq!(arena.atom_text(head), "quote");
        let rest = arena.cdr(outer).as_pair().unwrap();
        let x = arena.car(rest).as_atom().unwrap();
        assert_eq!(arena.atom_text(x), "x");
        assert_eq!(arena.cdr(rest), Value::Nil);
    }

    #[test]
    fn list_structure() {
        let mut arena = Arena::new(64);
        let val = read_str("(a (b) c)", &mut arena).unwrap();
        let items = arena.list_to_vec(val).unwrap();
        assert_eq!(items.len(), 3);
        assert!(items[0].is_atom());
        assert!(items[1].is_pair());
        assert!(items[2].is_atom());
    }

    #[test]
    fn stray_close_paren_is_an_error() {
        let mut arena = Arena::new(64);
        assert!(matches!(read_str(")", &mut arena), Err(SexprError::Parse(_))));
    }

    #[test]
    fn unterminated_forms_are_errors() {
        let mut arena = Arena::new(64);
        assert!(matches!(
            read_str("(a b", &mut arena),
            Err(SexprError::Parse(_))
        ));
        assert!(matches!(read_str("'", &mut arena), Err(SexprError::Parse(_))));
    }

    #[test]
    fn clean_end_of_input_is_not_an_error() {
        let mut arena = Arena::new(64);
        let mut reader = Reader::new("  \n ", &mut arena);
        assert_eq!(reader.read(), Ok(None));
    }

    #[test]
    fn read_one_at_advances_through_forms() {
        let mut arena = Arena::new(64);
        let input = "a (b c) ";
        let (first, pos) = read_one_at(input, 0, &mut arena).unwrap().unwrap();
        assert!(first.is_atom());
        let (second, pos) = read_one_at(input, pos, &mut arena).unwrap().unwrap();
        assert!(second.is_pair());
        assert_eq!(read_one_at(input, pos, &mut arena), Ok(None));
    }
}
