//! Recursive-descent parser for the scanned source language.
//!
//! Walks the token stream and materializes class and interface
//! declarations; everything else (function bodies, statements,
//! expressions) is skipped with brace matching. A parse failure is local
//! to its file — the scan driver logs it and moves on.

use std::fmt;
use std::path::Path;

use super::ast::{
    ClassDecl, Decorator, InterfaceDecl, MethodDecl, ParamDecl, SourceFile, TypeExpr, TypeShape,
};
use super::lexer::{tokenize, Token, TokenKind};

#[derive(Debug)]
pub struct ParseError {
    pub line: usize,
    pub message: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for ParseError {}

/// Parse one source file into the declarations the extractors need.
pub fn parse_source(path: &Path, rel_path: &str, source: &str) -> Result<SourceFile, ParseError> {
    let tokens = tokenize(source);
    let mut cur = Cursor {
        tokens: &tokens,
        src: source,
        pos: 0,
        last_end: 0,
        last_line: 0,
    };

    let mut classes = Vec::new();
    let mut interfaces = Vec::new();
    let mut decorators: Vec<Decorator> = Vec::new();
    let mut is_abstract = false;

    while let Some(tok) = cur.peek() {
        match &tok.kind {
            TokenKind::Punct('@') => {
                decorators.push(parse_decorator(&mut cur)?);
            }
            TokenKind::Ident(word) => match word.as_str() {
                "export" | "default" | "declare" => {
                    cur.next();
                }
                "abstract" => {
                    is_abstract = true;
                    cur.next();
                }
                "class" => {
                    cur.next();
                    classes.push(parse_class(
                        &mut cur,
                        std::mem::take(&mut decorators),
                        is_abstract,
                    )?);
                    is_abstract = false;
                }
                "interface" => {
                    cur.next();
                    if let Some(decl) = parse_interface(&mut cur) {
                        interfaces.push(decl);
                    }
                    decorators.clear();
                    is_abstract = false;
                }
                _ => {
                    cur.next();
                    decorators.clear();
                    is_abstract = false;
                }
            },
            _ => {
                cur.next();
                decorators.clear();
                is_abstract = false;
            }
        }
    }

    Ok(SourceFile {
        path: path.to_path_buf(),
        rel_path: rel_path.to_string(),
        classes,
        interfaces,
    })
}

// ── Cursor ──────────────────────────────────────────────────────────────────

struct Cursor<'a> {
    tokens: &'a [Token],
    src: &'a str,
    pos: usize,
    /// Byte offset just past the last consumed token (for raw slices).
    last_end: usize,
    /// Line of the last consumed token (for statement-boundary detection).
    last_line: usize,
}

impl<'a> Cursor<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&'a Token> {
        self.tokens.get(self.pos + offset)
    }

    fn next(&mut self) -> Option<&'a Token> {
        let tok = self.tokens.get(self.pos)?;
        self.pos += 1;
        self.last_end = tok.end;
        self.last_line = tok.line;
        Some(tok)
    }

    fn eat_punct(&mut self, ch: char) -> bool {
        if self.peek().is_some_and(|t| t.is_punct(ch)) {
            self.next();
            true
        } else {
            false
        }
    }

    fn line(&self) -> usize {
        self.peek().map(|t| t.line).unwrap_or(0)
    }

    fn slice(&self, start: usize) -> String {
        self.src[start..self.last_end].trim().to_string()
    }

    /// Consume from the current (opening) token through its balanced
    /// closing counterpart.
    fn skip_balanced(&mut self, open: char, close: char) {
        let mut depth = 0usize;
        while let Some(tok) = self.next() {
            match &tok.kind {
                TokenKind::Punct(c) if *c == open => depth += 1,
                TokenKind::Punct(c) if *c == close => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return;
                    }
                }
                _ => {}
            }
        }
    }
}

// ── Declarations ────────────────────────────────────────────────────────────

fn parse_decorator(cur: &mut Cursor) -> Result<Decorator, ParseError> {
    let at = cur.next().expect("caller checked '@'");
    let line = at.line;
    let name = match cur.peek().and_then(|t| t.ident_text()) {
        Some(_) => {
            let mut name = cur.next().unwrap().ident_text().unwrap().to_string();
            while cur.peek().is_some_and(|t| t.is_punct('.'))
                && cur.peek_at(1).and_then(|t| t.ident_text()).is_some()
            {
                cur.next();
                name.push('.');
                name.push_str(cur.next().unwrap().ident_text().unwrap());
            }
            name
        }
        None => {
            return Err(ParseError {
                line,
                message: "expected decorator name after '@'".into(),
            })
        }
    };

    let mut args = Vec::new();
    if cur.peek().is_some_and(|t| t.is_punct('(')) {
        let mut depth = 0usize;
        while let Some(tok) = cur.next() {
            match &tok.kind {
                TokenKind::Punct('(') => depth += 1,
                TokenKind::Punct(')') => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                TokenKind::Str(text) if depth == 1 => args.push(text.clone()),
                _ => {}
            }
        }
    }

    Ok(Decorator { name, args, line })
}

fn parse_class(
    cur: &mut Cursor,
    decorators: Vec<Decorator>,
    is_abstract: bool,
) -> Result<ClassDecl, ParseError> {
    let line = cur.line();
    let name = match cur.peek().and_then(|t| t.ident_text()) {
        Some(text) => {
            let owned = text.to_string();
            cur.next();
            owned
        }
        None => {
            return Err(ParseError {
                line,
                message: "expected class name".into(),
            })
        }
    };

    let type_params = if cur.peek().is_some_and(|t| t.is_punct('<')) {
        parse_type_params(cur)
    } else {
        Vec::new()
    };

    let mut extends = None;
    let mut implements = Vec::new();

    if cur.peek().is_some_and(|t| t.is_ident("extends")) {
        cur.next();
        extends = Some(parse_type(cur));
    }
    if cur.peek().is_some_and(|t| t.is_ident("implements")) {
        cur.next();
        loop {
            implements.push(parse_type(cur));
            if !cur.eat_punct(',') {
                break;
            }
        }
    }

    let mut decl = ClassDecl {
        name,
        line,
        is_abstract,
        type_params,
        extends,
        implements,
        decorators,
        ctor_params: Vec::new(),
        methods: Vec::new(),
    };

    // `declare class X;` has no body.
    if cur.peek().is_some_and(|t| t.is_punct('{')) {
        cur.next();
        parse_class_body(cur, &mut decl);
    }

    Ok(decl)
}

const PARAM_MODIFIERS: [&str; 5] = ["public", "private", "protected", "readonly", "override"];
const MEMBER_MODIFIERS: [&str; 8] = [
    "public", "private", "protected", "static", "async", "readonly", "override", "abstract",
];

fn parse_class_body(cur: &mut Cursor, decl: &mut ClassDecl) {
    let mut member_decorators: Vec<Decorator> = Vec::new();

    while let Some(tok) = cur.peek() {
        match &tok.kind {
            TokenKind::Punct('}') => {
                cur.next();
                return;
            }
            TokenKind::Punct('@') => {
                match parse_decorator(cur) {
                    Ok(dec) => member_decorators.push(dec),
                    Err(_) => {
                        cur.next();
                    }
                }
            }
            TokenKind::Punct('{') => {
                cur.skip_balanced('{', '}');
                member_decorators.clear();
            }
            TokenKind::Punct(';') => {
                cur.next();
                member_decorators.clear();
            }
            TokenKind::Ident(word) if MEMBER_MODIFIERS.contains(&word.as_str()) => {
                // Modifier only when another member token follows; else it
                // is a member named like a modifier.
                let next_is_member = cur
                    .peek_at(1)
                    .is_some_and(|t| t.ident_text().is_some() || t.is_punct('@'));
                if next_is_member {
                    cur.next();
                } else {
                    skip_member(cur);
                    member_decorators.clear();
                }
            }
            TokenKind::Ident(word) if word == "constructor" => {
                let line = tok.line;
                cur.next();
                if cur.peek().is_some_and(|t| t.is_punct('(')) {
                    decl.ctor_params = parse_params(cur, line);
                }
                skip_member_tail(cur);
                member_decorators.clear();
            }
            TokenKind::Ident(_) => {
                let name = tok.ident_text().unwrap().to_string();
                let line = tok.line;
                cur.next();
                // Generic method: name<T>(...)
                if cur.peek().is_some_and(|t| t.is_punct('<')) {
                    cur.skip_balanced('<', '>');
                }
                if cur.peek().is_some_and(|t| t.is_punct('(')) {
                    let params = parse_params(cur, line);
                    let return_type = if cur.eat_punct(':') {
                        Some(parse_type(cur))
                    } else {
                        None
                    };
                    skip_member_tail(cur);
                    if !member_decorators.is_empty() {
                        decl.methods.push(MethodDecl {
                            name,
                            line,
                            decorators: std::mem::take(&mut member_decorators),
                            params,
                            return_type,
                        });
                    }
                } else {
                    // Field declaration; skip through its initializer.
                    skip_member(cur);
                    member_decorators.clear();
                }
            }
            _ => {
                cur.next();
                member_decorators.clear();
            }
        }
    }
}

/// Skip a member body (`{ ... }`) or trailing `;`.
fn skip_member_tail(cur: &mut Cursor) {
    if cur.peek().is_some_and(|t| t.is_punct('{')) {
        cur.skip_balanced('{', '}');
    } else {
        cur.eat_punct(';');
    }
}

/// Skip a field declaration through `;`, up to the class-closing `}`, or —
/// when the field has no terminating semicolon — up to the token that
/// starts the next member (an identifier or decorator on a fresh line
/// right after an expression-ending token).
fn skip_member(cur: &mut Cursor) {
    let mut prev_ends_expr = false;
    while let Some(tok) = cur.peek() {
        let starts_new_line = cur.last_line != 0 && tok.line > cur.last_line;
        if prev_ends_expr
            && starts_new_line
            && (tok.ident_text().is_some() || tok.is_punct('@'))
        {
            return;
        }
        match &tok.kind {
            TokenKind::Punct(';') => {
                cur.next();
                return;
            }
            TokenKind::Punct('}') => return,
            TokenKind::Punct('{') => {
                cur.skip_balanced('{', '}');
                prev_ends_expr = true;
            }
            TokenKind::Punct('(') => {
                cur.skip_balanced('(', ')');
                prev_ends_expr = true;
            }
            TokenKind::Punct('[') => {
                cur.skip_balanced('[', ']');
                prev_ends_expr = true;
            }
            _ => {
                prev_ends_expr = matches!(
                    &tok.kind,
                    TokenKind::Ident(_) | TokenKind::Str(_) | TokenKind::Num(_)
                );
                cur.next();
            }
        }
    }
}

fn parse_params(cur: &mut Cursor, line: usize) -> Vec<ParamDecl> {
    let mut params = Vec::new();
    cur.next(); // '('

    loop {
        let Some(tok) = cur.peek() else { return params };
        match &tok.kind {
            TokenKind::Punct(')') => {
                cur.next();
                return params;
            }
            TokenKind::Punct(',') => {
                cur.next();
            }
            _ => {
                if let Some(param) = parse_one_param(cur, line) {
                    params.push(param);
                } else {
                    // Could not make sense of this parameter; resync.
                    skip_to_param_boundary(cur);
                }
            }
        }
    }
}

fn parse_one_param(cur: &mut Cursor, ctor_line: usize) -> Option<ParamDecl> {
    let mut decorators = Vec::new();
    while cur.peek().is_some_and(|t| t.is_punct('@')) {
        decorators.push(parse_decorator(cur).ok()?);
    }

    // Visibility / readonly modifiers: only treated as modifiers when an
    // identifier follows (otherwise they are the parameter name itself).
    while cur
        .peek()
        .and_then(|t| t.ident_text())
        .is_some_and(|w| PARAM_MODIFIERS.contains(&w))
        && cur.peek_at(1).is_some_and(|t| t.ident_text().is_some())
    {
        cur.next();
    }

    // Rest parameter: `...name`
    while cur.peek().is_some_and(|t| t.is_punct('.')) {
        cur.next();
    }

    let tok = cur.peek()?;
    let name = tok.ident_text()?.to_string();
    let line = tok.line;
    cur.next();

    let optional = cur.eat_punct('?');
    let ty = if cur.eat_punct(':') {
        Some(parse_type(cur))
    } else {
        None
    };

    if cur.eat_punct('=') {
        skip_default_value(cur);
    }

    Some(ParamDecl {
        name,
        line: line.max(ctor_line),
        optional,
        decorators,
        ty,
    })
}

/// Skip a default-value expression up to the next `,` or `)` at depth 0.
fn skip_default_value(cur: &mut Cursor) {
    while let Some(tok) = cur.peek() {
        match &tok.kind {
            TokenKind::Punct(',') | TokenKind::Punct(')') => return,
            TokenKind::Punct('(') => cur.skip_balanced('(', ')'),
            TokenKind::Punct('{') => cur.skip_balanced('{', '}'),
            TokenKind::Punct('[') => cur.skip_balanced('[', ']'),
            _ => {
                cur.next();
            }
        }
    }
}

fn skip_to_param_boundary(cur: &mut Cursor) {
    while let Some(tok) = cur.peek() {
        match &tok.kind {
            TokenKind::Punct(',') | TokenKind::Punct(')') => return,
            TokenKind::Punct('(') => cur.skip_balanced('(', ')'),
            TokenKind::Punct('{') => cur.skip_balanced('{', '}'),
            TokenKind::Punct('<') => cur.skip_balanced('<', '>'),
            _ => {
                cur.next();
            }
        }
    }
}

fn parse_interface(cur: &mut Cursor) -> Option<InterfaceDecl> {
    let tok = cur.peek()?;
    let name = tok.ident_text()?.to_string();
    let line = tok.line;
    cur.next();

    let type_params = if cur.peek().is_some_and(|t| t.is_punct('<')) {
        parse_type_params(cur)
    } else {
        Vec::new()
    };

    // Skip any `extends` clause, then the body.
    while let Some(tok) = cur.peek() {
        if tok.is_punct('{') {
            cur.skip_balanced('{', '}');
            break;
        }
        if tok.is_punct(';') || tok.is_ident("class") || tok.is_ident("interface") {
            break;
        }
        cur.next();
    }

    Some(InterfaceDecl {
        name,
        line,
        type_params,
    })
}

/// Parse `<T, U extends Foo, ...>`, returning the parameter names.
fn parse_type_params(cur: &mut Cursor) -> Vec<String> {
    let mut params = Vec::new();
    let mut depth = 0usize;
    let mut expecting = true;
    while let Some(tok) = cur.next() {
        match &tok.kind {
            TokenKind::Punct('<') => depth += 1,
            TokenKind::Punct('>') => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            TokenKind::Punct(',') if depth == 1 => expecting = true,
            TokenKind::Ident(name) if depth == 1 && expecting => {
                params.push(name.clone());
                expecting = false;
            }
            _ => {}
        }
    }
    params
}

// ── Types ───────────────────────────────────────────────────────────────────

/// Parse a type annotation: unions of postfixed primaries.
fn parse_type(cur: &mut Cursor) -> TypeExpr {
    let start = cur.peek().map(|t| t.start).unwrap_or(cur.last_end);

    // Tolerate a leading `|` in union annotations.
    cur.eat_punct('|');
    let first = parse_postfix_type(cur);

    if cur.peek().is_some_and(|t| t.is_punct('|')) {
        let mut members = vec![first];
        while cur.eat_punct('|') {
            members.push(parse_postfix_type(cur));
        }
        TypeExpr {
            raw: cur.slice(start),
            shape: TypeShape::Union(members),
        }
    } else {
        first
    }
}

fn parse_postfix_type(cur: &mut Cursor) -> TypeExpr {
    let start = cur.peek().map(|t| t.start).unwrap_or(cur.last_end);
    let mut expr = parse_primary_type(cur);

    while cur.peek().is_some_and(|t| t.is_punct('['))
        && cur.peek_at(1).is_some_and(|t| t.is_punct(']'))
    {
        cur.next();
        cur.next();
        expr = TypeExpr {
            raw: cur.slice(start),
            shape: TypeShape::Array(Box::new(expr)),
        };
    }

    expr
}

fn parse_primary_type(cur: &mut Cursor) -> TypeExpr {
    let Some(tok) = cur.peek() else {
        return TypeExpr {
            raw: String::new(),
            shape: TypeShape::Named {
                name: String::new(),
                args: Vec::new(),
            },
        };
    };
    let start = tok.start;

    match &tok.kind {
        TokenKind::Punct('{') => {
            cur.skip_balanced('{', '}');
            TypeExpr {
                raw: cur.slice(start),
                shape: TypeShape::Object,
            }
        }
        TokenKind::Punct('(') => {
            // Parenthesized or function type; treated as opaque.
            cur.skip_balanced('(', ')');
            if cur.peek().is_some_and(|t| t.is_punct('='))
                && cur.peek_at(1).is_some_and(|t| t.is_punct('>'))
            {
                cur.next();
                cur.next();
                parse_postfix_type(cur);
            }
            let raw = cur.slice(start);
            TypeExpr {
                shape: TypeShape::Named {
                    name: raw.clone(),
                    args: Vec::new(),
                },
                raw,
            }
        }
        TokenKind::Str(text) | TokenKind::Num(text) => {
            let name = text.clone();
            cur.next();
            TypeExpr {
                raw: cur.slice(start),
                shape: TypeShape::Named {
                    name,
                    args: Vec::new(),
                },
            }
        }
        TokenKind::Ident(_) => {
            let mut name = cur.next().unwrap().ident_text().unwrap().to_string();
            while cur.peek().is_some_and(|t| t.is_punct('.'))
                && cur.peek_at(1).and_then(|t| t.ident_text()).is_some()
            {
                cur.next();
                name.push('.');
                name.push_str(cur.next().unwrap().ident_text().unwrap());
            }

            let mut args = Vec::new();
            if cur.peek().is_some_and(|t| t.is_punct('<')) {
                cur.next();
                loop {
                    args.push(parse_type(cur));
                    if cur.eat_punct(',') {
                        continue;
                    }
                    cur.eat_punct('>');
                    break;
                }
            }

            TypeExpr {
                raw: cur.slice(start),
                shape: TypeShape::Named { name, args },
            }
        }
        _ => {
            cur.next();
            TypeExpr {
                raw: cur.slice(start),
                shape: TypeShape::Named {
                    name: cur.slice(start),
                    args: Vec::new(),
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn parse(src: &str) -> SourceFile {
        parse_source(&PathBuf::from("test.ts"), "test.ts", src).unwrap()
    }

    #[test]
    fn class_with_decorators_and_interfaces() {
        let file = parse(
            r#"
            @Service()
            @Scope("transient")
            export class ConsoleLogger implements LoggerInterface, Flushable {
                log(msg: string): void {}
            }
            "#,
        );
        let class = &file.classes[0];
        assert_eq!(class.name, "ConsoleLogger");
        assert!(class.has_decorator("Service"));
        assert_eq!(class.decorator("Scope").unwrap().args, vec!["transient"]);
        let names: Vec<_> = class
            .implements
            .iter()
            .map(|t| t.head_name().unwrap())
            .collect();
        assert_eq!(names, vec!["LoggerInterface", "Flushable"]);
        assert!(class.methods.is_empty(), "undecorated methods are skipped");
    }

    #[test]
    fn generic_class_and_extends_clause() {
        let file = parse(
            "@Service()\nclass MemoryCache<T> extends BaseCache<T, string> implements CacheInterface<T> {}",
        );
        let class = &file.classes[0];
        assert_eq!(class.type_params, vec!["T"]);
        let base = class.extends.as_ref().unwrap();
        assert_eq!(base.head_name(), Some("BaseCache"));
        assert_eq!(base.args().len(), 2);
        assert_eq!(base.raw, "BaseCache<T, string>");
        assert!(class.implements[0].is_generic());
    }

    #[test]
    fn constructor_params_with_markers() {
        let file = parse(
            r#"
            @Service()
            class ApiService {
                constructor(
                    @Inject() private logger: LoggerInterface,
                    private cache?: Inject<CacheInterface<string>>,
                    plain: number,
                    @InjectOptional() metrics?: MetricsInterface,
                ) {}
            }
            "#,
        );
        let params = &file.classes[0].ctor_params;
        assert_eq!(params.len(), 4);
        assert_eq!(params[0].name, "logger");
        assert!(params[0].decorators[0].name == "Inject");
        assert_eq!(params[0].ty.as_ref().unwrap().raw, "LoggerInterface");
        assert!(params[1].optional);
        assert_eq!(
            params[1].ty.as_ref().unwrap().raw,
            "Inject<CacheInterface<string>>"
        );
        assert!(params[3].optional);
    }

    #[test]
    fn interfaces_record_lines() {
        let file = parse("interface A { x: number }\n\ninterface B<T> extends A { y: T }\n");
        assert_eq!(file.interfaces.len(), 2);
        assert_eq!(file.interfaces[0].name, "A");
        assert_eq!(file.interfaces[0].line, 1);
        assert_eq!(file.interfaces[1].name, "B");
        assert_eq!(file.interfaces[1].line, 3);
        assert_eq!(file.interfaces[1].type_params, vec!["T"]);
    }

    #[test]
    fn decorated_methods_are_captured() {
        let file = parse(
            r#"
            @Configuration()
            class AppConfig {
                @Bean()
                @Qualifier("fast")
                createLogger(api: ApiInterface): LoggerInterface {
                    return new ConsoleLogger(api);
                }
                helper(): void {}
            }
            "#,
        );
        let class = &file.classes[0];
        assert_eq!(class.methods.len(), 1);
        let method = &class.methods[0];
        assert_eq!(method.name, "createLogger");
        assert!(method.has_decorator("Bean"));
        assert_eq!(method.params[0].ty.as_ref().unwrap().raw, "ApiInterface");
        assert_eq!(method.return_type.as_ref().unwrap().raw, "LoggerInterface");
    }

    #[test]
    fn union_array_and_object_types() {
        let file = parse(
            r#"
            @Service()
            class Shapes {
                constructor(
                    @Inject() a: A | B,
                    @Inject() b: Item[],
                    @Inject() c: { id: number },
                ) {}
            }
            "#,
        );
        let params = &file.classes[0].ctor_params;
        assert!(matches!(
            params[0].ty.as_ref().unwrap().shape,
            TypeShape::Union(_)
        ));
        assert!(matches!(
            params[1].ty.as_ref().unwrap().shape,
            TypeShape::Array(_)
        ));
        assert!(matches!(
            params[2].ty.as_ref().unwrap().shape,
            TypeShape::Object
        ));
    }

    #[test]
    fn default_values_and_bodies_are_skipped() {
        let file = parse(
            r#"
            @Service()
            class Defaults {
                count = { a: 1, b: [2, 3] };
                constructor(@Inject() dep: DepInterface, flag: boolean = (1 > 0)) {
                    this.x = flag;
                }
                private helper() { return new Map<string, number>(); }
            }
            "#,
        );
        let class = &file.classes[0];
        assert_eq!(class.ctor_params.len(), 2);
        assert_eq!(class.ctor_params[1].name, "flag");
    }

    #[test]
    fn malformed_class_reports_error() {
        let err = parse_source(&PathBuf::from("bad.ts"), "bad.ts", "class {").unwrap_err();
        assert!(err.message.contains("class name"));
    }
}
