//! # Content Expressions
//!
//! Compiles a node type's content expression (`"paragraph block*"`,
//! `"(text | image)*"`, `"table_cell{1,4}"`) into a nondeterministic
//! automaton over node type ids.
//!
//! Grammar:
//!
//! ```text
//! expr     := seq ('|' seq)*
//! seq      := postfix+
//! postfix  := atom ('*' | '+' | '?' | '{' n (',' m?)? '}')*
//! atom     := name | '(' expr ')'
//! ```
//!
//! A name is either a node type or a group; a group expands to the choice
//! of every type declared in it, in declaration order.

use std::collections::{HashSet, VecDeque};
use std::fmt;

use logos::Logos;

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Choice(Vec<Expr>),
    Seq(Vec<Expr>),
    Star(Box<Expr>),
    Plus(Box<Expr>),
    Opt(Box<Expr>),
    Range {
        expr: Box<Expr>,
        min: usize,
        max: Option<usize>,
    },
    Name(usize),
}

#[derive(Debug, Clone, Copy)]
struct Edge {
    term: Option<usize>,
    to: usize,
}

/// Compiled content matcher
#[derive(Debug, Clone)]
pub(crate) struct ContentExpr {
    states: Vec<Vec<Edge>>,
    accept: usize,
    source: String,
}

impl ContentExpr {
    /// Matcher that only accepts empty content (leaf nodes)
    pub(crate) fn empty() -> Self {
        Self {
            states: vec![Vec::new()],
            accept: 0,
            source: String::new(),
        }
    }

    /// Parse and compile an expression. `resolve` maps a name to the type
    /// ids it stands for (one id for a type, several for a group).
    pub(crate) fn parse(
        source: &str,
        resolve: &dyn Fn(&str) -> Option<Vec<usize>>,
    ) -> Result<Self, String> {
        let tokens = tokenize(source)?;
        if tokens.is_empty() {
            return Ok(Self::empty());
        }

        let mut stream = TokenStream {
            tokens,
            pos: 0,
            resolve,
        };
        let expr = stream.parse_expr()?;
        if let Some(tok) = stream.peek() {
            return Err(format!("Unexpected trailing token '{}'", tok));
        }

        let mut builder = NfaBuilder::default();
        let start = builder.node();
        let dangling = builder.compile(&expr, start);
        let accept = builder.node();
        builder.connect(&dangling, accept);

        Ok(Self {
            states: builder.finish(),
            accept,
            source: source.trim().to_string(),
        })
    }

    pub(crate) fn source(&self) -> &str {
        &self.source
    }

    /// True when the expression admits no children at all
    pub(crate) fn is_leaf(&self) -> bool {
        self.states.iter().all(|edges| edges.iter().all(|e| e.term.is_none()))
    }

    pub(crate) fn start(&self) -> Vec<usize> {
        self.closure(vec![0])
    }

    fn closure(&self, seed: Vec<usize>) -> Vec<usize> {
        let mut seen: HashSet<usize> = seed.iter().copied().collect();
        let mut work = seed;
        while let Some(state) = work.pop() {
            for edge in &self.states[state] {
                if edge.term.is_none() && seen.insert(edge.to) {
                    work.push(edge.to);
                }
            }
        }
        let mut out: Vec<usize> = seen.into_iter().collect();
        out.sort_unstable();
        out
    }

    /// Advance a state set over one child of type `ty`. Empty result means
    /// the child is not allowed here.
    pub(crate) fn step(&self, set: &[usize], ty: usize) -> Vec<usize> {
        let next: Vec<usize> = set
            .iter()
            .flat_map(|&s| self.states[s].iter())
            .filter(|edge| edge.term == Some(ty))
            .map(|edge| edge.to)
            .collect();
        if next.is_empty() {
            return next;
        }
        self.closure(next)
    }

    pub(crate) fn accepts(&self, set: &[usize]) -> bool {
        set.contains(&self.accept)
    }

    /// Check a full child type sequence
    pub(crate) fn matches(&self, types: impl IntoIterator<Item = usize>) -> bool {
        let mut set = self.start();
        for ty in types {
            set = self.step(&set, ty);
            if set.is_empty() {
                return false;
            }
        }
        self.accepts(&set)
    }

    /// Types that may appear as the first child
    pub(crate) fn first_types(&self) -> Vec<usize> {
        self.terms_from(&self.start())
    }

    /// Every type referenced anywhere in the expression
    pub(crate) fn all_types(&self) -> Vec<usize> {
        let mut out = Vec::new();
        for edge in self.states.iter().flatten() {
            if let Some(ty) = edge.term {
                if !out.contains(&ty) {
                    out.push(ty);
                }
            }
        }
        out
    }

    fn terms_from(&self, set: &[usize]) -> Vec<usize> {
        let mut out = Vec::new();
        for &state in set {
            for edge in &self.states[state] {
                if let Some(ty) = edge.term {
                    if !out.contains(&ty) {
                        out.push(ty);
                    }
                }
            }
        }
        out
    }

    /// Shortest sequence of types that completes the expression from the
    /// start state, using only types for which `can_create` holds.
    pub(crate) fn shortest_fill(&self, can_create: &dyn Fn(usize) -> bool) -> Option<Vec<usize>> {
        let start = self.start();
        let mut seen: HashSet<Vec<usize>> = HashSet::new();
        let mut queue: VecDeque<(Vec<usize>, Vec<usize>)> = VecDeque::new();
        seen.insert(start.clone());
        queue.push_back((start, Vec::new()));

        while let Some((set, path)) = queue.pop_front() {
            if self.accepts(&set) {
                return Some(path);
            }
            for ty in self.terms_from(&set) {
                if !can_create(ty) {
                    continue;
                }
                let next = self.step(&set, ty);
                if !next.is_empty() && seen.insert(next.clone()) {
                    let mut next_path = path.clone();
                    next_path.push(ty);
                    queue.push_back((next, next_path));
                }
            }
        }
        None
    }
}

/// Content expression tokens
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
enum Token<'src> {
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice())]
    Name(&'src str),

    #[regex(r"[0-9]+", |lex| lex.slice().parse::<usize>().ok())]
    Number(usize),

    #[token("|")]
    Pipe,

    #[token("*")]
    Star,

    #[token("+")]
    Plus,

    #[token("?")]
    Question,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    #[token(",")]
    Comma,
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Name(name) => write!(f, "{}", name),
            Token::Number(n) => write!(f, "{}", n),
            Token::Pipe => write!(f, "|"),
            Token::Star => write!(f, "*"),
            Token::Plus => write!(f, "+"),
            Token::Question => write!(f, "?"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::Comma => write!(f, ","),
        }
    }
}

/// Tokenize an expression, failing on the first character that is not
/// part of the grammar
fn tokenize(source: &str) -> Result<Vec<Token<'_>>, String> {
    Token::lexer(source)
        .spanned()
        .map(|(result, span)| {
            result.map_err(|_| format!("Unexpected character '{}' at {}", &source[span.clone()], span.start))
        })
        .collect()
}

struct TokenStream<'a> {
    tokens: Vec<Token<'a>>,
    pos: usize,
    resolve: &'a dyn Fn(&str) -> Option<Vec<usize>>,
}

impl<'a> TokenStream<'a> {
    fn peek(&self) -> Option<Token<'a>> {
        self.tokens.get(self.pos).copied()
    }

    fn eat(&mut self, tok: Token<'a>) -> bool {
        if self.peek() == Some(tok) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn next(&mut self) -> Option<Token<'a>> {
        let tok = self.peek();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn parse_expr(&mut self) -> Result<Expr, String> {
        let mut choices = vec![self.parse_seq()?];
        while self.eat(Token::Pipe) {
            choices.push(self.parse_seq()?);
        }
        Ok(if choices.len() == 1 {
            choices.remove(0)
        } else {
            Expr::Choice(choices)
        })
    }

    fn parse_seq(&mut self) -> Result<Expr, String> {
        let mut exprs = Vec::new();
        loop {
            exprs.push(self.parse_postfix()?);
            match self.peek() {
                None | Some(Token::RParen) | Some(Token::Pipe) => break,
                _ => {}
            }
        }
        Ok(if exprs.len() == 1 {
            exprs.remove(0)
        } else {
            Expr::Seq(exprs)
        })
    }

    fn parse_postfix(&mut self) -> Result<Expr, String> {
        let mut expr = self.parse_atom()?;
        loop {
            if self.eat(Token::Plus) {
                expr = Expr::Plus(Box::new(expr));
            } else if self.eat(Token::Star) {
                expr = Expr::Star(Box::new(expr));
            } else if self.eat(Token::Question) {
                expr = Expr::Opt(Box::new(expr));
            } else if self.eat(Token::LBrace) {
                expr = self.parse_range(expr)?;
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_number(&mut self) -> Result<usize, String> {
        match self.next() {
            Some(Token::Number(n)) => Ok(n),
            Some(tok) => Err(format!("Expected number, found '{}'", tok)),
            None => Err("Expected number, found end of expression".to_string()),
        }
    }

    fn parse_range(&mut self, expr: Expr) -> Result<Expr, String> {
        let min = self.parse_number()?;
        let max = if self.eat(Token::Comma) {
            if self.peek() == Some(Token::RBrace) {
                None
            } else {
                Some(self.parse_number()?)
            }
        } else {
            Some(min)
        };
        if !self.eat(Token::RBrace) {
            return Err("Unclosed braced range".to_string());
        }
        if let Some(max) = max {
            if max < min {
                return Err(format!("Invalid range {{{},{}}}", min, max));
            }
        }
        Ok(Expr::Range {
            expr: Box::new(expr),
            min,
            max,
        })
    }

    fn parse_atom(&mut self) -> Result<Expr, String> {
        if self.eat(Token::LParen) {
            let expr = self.parse_expr()?;
            if !self.eat(Token::RParen) {
                return Err("Missing closing paren".to_string());
            }
            return Ok(expr);
        }

        let name = match self.next() {
            Some(Token::Name(name)) => name,
            Some(tok) => return Err(format!("Unexpected token '{}'", tok)),
            None => return Err("Unexpected end of expression".to_string()),
        };
        let ids = (self.resolve)(name).ok_or_else(|| format!("No node type or group '{}'", name))?;
        let mut names: Vec<Expr> = ids.into_iter().map(Expr::Name).collect();
        Ok(if names.len() == 1 {
            names.remove(0)
        } else {
            Expr::Choice(names)
        })
    }
}

#[derive(Debug, Default)]
struct NfaBuilder {
    states: Vec<Vec<usize>>,
    edges: Vec<(Option<usize>, Option<usize>)>,
}

impl NfaBuilder {
    fn node(&mut self) -> usize {
        self.states.push(Vec::new());
        self.states.len() - 1
    }

    fn edge(&mut self, from: usize, to: Option<usize>, term: Option<usize>) -> usize {
        self.edges.push((term, to));
        let id = self.edges.len() - 1;
        self.states[from].push(id);
        id
    }

    fn connect(&mut self, edges: &[usize], to: usize) {
        for &edge in edges {
            self.edges[edge].1 = Some(to);
        }
    }

    /// Compile `expr` starting at state `from`; returns the dangling edges
    /// that leave the fragment.
    fn compile(&mut self, expr: &Expr, from: usize) -> Vec<usize> {
        match expr {
            Expr::Choice(exprs) => exprs.iter().flat_map(|e| self.compile(e, from)).collect(),
            Expr::Seq(exprs) => {
                let mut from = from;
                let mut out = Vec::new();
                for (i, e) in exprs.iter().enumerate() {
                    out = self.compile(e, from);
                    if i + 1 < exprs.len() {
                        from = self.node();
                        self.connect(&out, from);
                    }
                }
                out
            }
            Expr::Star(inner) => {
                let lp = self.node();
                self.edge(from, Some(lp), None);
                let out = self.compile(inner, lp);
                self.connect(&out, lp);
                vec![self.edge(lp, None, None)]
            }
            Expr::Plus(inner) => {
                let lp = self.node();
                let first = self.compile(inner, from);
                self.connect(&first, lp);
                let again = self.compile(inner, lp);
                self.connect(&again, lp);
                vec![self.edge(lp, None, None)]
            }
            Expr::Opt(inner) => {
                let mut out = vec![self.edge(from, None, None)];
                out.extend(self.compile(inner, from));
                out
            }
            Expr::Range { expr, min, max } => {
                let mut cur = from;
                for _ in 0..*min {
                    let next = self.node();
                    let out = self.compile(expr, cur);
                    self.connect(&out, next);
                    cur = next;
                }
                match max {
                    None => {
                        let out = self.compile(expr, cur);
                        self.connect(&out, cur);
                    }
                    Some(max) => {
                        for _ in *min..*max {
                            let next = self.node();
                            self.edge(cur, Some(next), None);
                            let out = self.compile(expr, cur);
                            self.connect(&out, next);
                            cur = next;
                        }
                    }
                }
                vec![self.edge(cur, None, None)]
            }
            Expr::Name(ty) => vec![self.edge(from, None, Some(*ty))],
        }
    }

    fn finish(self) -> Vec<Vec<Edge>> {
        let edges = self.edges;
        self.states
            .into_iter()
            .map(|ids| {
                ids.into_iter()
                    .filter_map(|id| {
                        let (term, to) = edges[id];
                        to.map(|to| Edge { term, to })
                    })
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 0 = paragraph, 1 = heading, 2 = text, 3 = image
    fn resolve(name: &str) -> Option<Vec<usize>> {
        match name {
            "paragraph" => Some(vec![0]),
            "heading" => Some(vec![1]),
            "text" => Some(vec![2]),
            "image" => Some(vec![3]),
            "block" => Some(vec![0, 1]),
            "inline" => Some(vec![2, 3]),
            _ => None,
        }
    }

    fn compile(source: &str) -> ContentExpr {
        ContentExpr::parse(source, &resolve).unwrap()
    }

    #[test]
    fn test_plus_requires_one() {
        let expr = compile("block+");
        assert!(!expr.matches([]));
        assert!(expr.matches([0]));
        assert!(expr.matches([0, 1, 0]));
        assert!(!expr.matches([2]));
    }

    #[test]
    fn test_star_and_choice() {
        let expr = compile("(text | image)*");
        assert!(expr.matches([]));
        assert!(expr.matches([2, 3, 2]));
        assert!(!expr.matches([0]));
    }

    #[test]
    fn test_sequence_with_optional() {
        let expr = compile("heading paragraph?");
        assert!(expr.matches([1]));
        assert!(expr.matches([1, 0]));
        assert!(!expr.matches([0]));
        assert!(!expr.matches([1, 0, 0]));
    }

    #[test]
    fn test_braced_ranges() {
        let exact = compile("paragraph{2}");
        assert!(!exact.matches([0]));
        assert!(exact.matches([0, 0]));
        assert!(!exact.matches([0, 0, 0]));

        let bounded = compile("paragraph{1,3}");
        assert!(bounded.matches([0, 0, 0]));
        assert!(!bounded.matches([0, 0, 0, 0]));

        let open = compile("paragraph{2,}");
        assert!(!open.matches([0]));
        assert!(open.matches([0, 0, 0, 0, 0]));
    }

    #[test]
    fn test_unknown_name_is_rejected() {
        let err = ContentExpr::parse("paragraph widget*", &resolve).unwrap_err();
        assert!(err.contains("widget"));
    }

    #[test]
    fn test_unbalanced_paren_is_rejected() {
        assert!(ContentExpr::parse("(paragraph | heading", &resolve).is_err());
    }

    #[test]
    fn test_empty_expression_is_leaf() {
        let expr = compile("");
        assert!(expr.is_leaf());
        assert!(expr.matches([]));
        assert!(!expr.matches([2]));
    }

    #[test]
    fn test_tokenize() {
        let tokens = tokenize("(text | image)* table_cell{1, 4}").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::LParen,
                Token::Name("text"),
                Token::Pipe,
                Token::Name("image"),
                Token::RParen,
                Token::Star,
                Token::Name("table_cell"),
                Token::LBrace,
                Token::Number(1),
                Token::Comma,
                Token::Number(4),
                Token::RBrace,
            ]
        );
    }

    #[test]
    fn test_stray_character_is_rejected() {
        let err = ContentExpr::parse("paragraph & heading", &resolve).unwrap_err();
        assert!(err.contains('&'));
        assert!(ContentExpr::parse("paragraph{x}", &resolve).is_err());
    }

    #[test]
    fn test_shortest_fill() {
        let expr = compile("heading paragraph+");
        assert_eq!(expr.shortest_fill(&|_| true), Some(vec![1, 0]));
        assert_eq!(compile("block*").shortest_fill(&|_| true), Some(vec![]));
        assert_eq!(compile("text+").shortest_fill(&|ty| ty != 2), None);
    }
}
