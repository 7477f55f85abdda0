//! Token-based parser for FEEL
//!
//! This module implements a recursive descent parser that consumes
//! tokens from the lexer to build the syntax tree. FEEL names may contain
//! spaces and punctuation (`date and time`, `Customer's age`), so names are
//! recovered from the source text: first by longest match against the names
//! known up front (built-ins, context keys, type names) and those the
//! expression itself introduces, then by joining adjacent name tokens.

use crate::ast::{
    ArithmeticOperator, Arguments, ComparisonOperator, ContextEntry, Expression, Iteration,
    IterationSource, LogicalOperator, Quantifier, SourceSpan,
};
use crate::error::SyntaxError;
use crate::lexer::{Token, TokenKind};
use crate::types::TypeRef;

type ParseResult<T> = Result<T, SyntaxError>;

/// Parser that consumes tokens to produce a syntax tree
pub struct TokenParser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    position: usize,
    /// Names known before parsing starts
    known_names: Vec<String>,
    /// Names introduced by the expression (iteration variables, parameters, context keys)
    scoped_names: Vec<String>,
    /// Enclosing constructs and their start offsets, innermost last
    nodes: Vec<(&'static str, usize)>,
    /// Indices of unknown tokens swallowed by a matched name
    consumed_unknown: Vec<usize>,
    /// Parsing the end bound of an interval, where `[` may close it (`]a..b[`)
    in_interval_end: bool,
}

impl<'a> TokenParser<'a> {
    /// Create a new parser from a token stream
    pub fn new(source: &'a str, tokens: Vec<Token>, known_names: Vec<String>) -> Self {
        let known_names = known_names.into_iter().filter(|n| !n.is_empty()).collect();
        Self {
            source,
            tokens,
            position: 0,
            known_names,
            scoped_names: Vec::new(),
            nodes: Vec::new(),
            consumed_unknown: Vec::new(),
            in_interval_end: false,
        }
    }

    /// Parse a complete expression
    pub fn parse_expression_root(&mut self) -> ParseResult<Expression> {
        self.nodes.push(("expression", 0));
        let result = self.parse_expression().and_then(|expr| {
            self.expect_end()?;
            Ok(expr)
        });
        result.map_err(|e| self.prefer_unrecognized(e))
    }

    /// Parse a complete list of unary tests, optionally wrapped in `not(...)`
    pub fn parse_unary_tests_root(&mut self) -> ParseResult<Expression> {
        self.nodes.push(("unary tests", 0));
        let result = self.parse_unary_tests();
        result.map_err(|e| self.prefer_unrecognized(e))
    }

    fn parse_unary_tests(&mut self) -> ParseResult<Expression> {
        let start = self.position;

        if self.is_at_end() {
            let span = SourceSpan::new(0, self.source.len());
            return Ok(Expression::UnaryTests {
                tests: vec![Expression::AnyInput { span }],
                negated: false,
                span,
            });
        }

        if matches!(&self.current().kind, TokenKind::Name(n) if n == "not")
            && self.check_at(1, &TokenKind::LeftParen)
        {
            let saved = self.save();
            match self.parse_negated_tests() {
                Ok(tests) => {
                    return Ok(Expression::UnaryTests {
                        tests,
                        negated: true,
                        span: self.span_from(start),
                    })
                }
                Err(_) => self.restore(saved),
            }
        }

        let tests = self.parse_unary_test_list()?;
        self.expect_end()?;
        Ok(Expression::UnaryTests {
            tests,
            negated: false,
            span: self.span_from(start),
        })
    }

    /// `not(test, ...)` spanning the whole input
    fn parse_negated_tests(&mut self) -> ParseResult<Vec<Expression>> {
        self.advance();
        self.advance();
        let tests = self.parse_unary_test_list()?;
        self.expect(&TokenKind::RightParen)?;
        self.expect_end()?;
        Ok(tests)
    }

    fn parse_unary_test_list(&mut self) -> ParseResult<Vec<Expression>> {
        let mut tests = vec![self.parse_unary_test()?];
        while self.check(&TokenKind::Comma) {
            self.advance();
            tests.push(self.parse_unary_test()?);
        }
        Ok(tests)
    }

    /// A unary test, including the `-` wildcard
    fn parse_unary_test(&mut self) -> ParseResult<Expression> {
        if self.check(&TokenKind::Minus)
            && matches!(
                self.peek(1).kind,
                TokenKind::Comma | TokenKind::Eof | TokenKind::RightParen
            )
        {
            let span = self.current_span();
            self.advance();
            return Ok(Expression::AnyInput { span });
        }
        self.parse_positive_unary_test()
    }

    /// `< e`, `<= e`, `> e`, `>= e`, `= e`, `!= e`, or any expression
    fn parse_positive_unary_test(&mut self) -> ParseResult<Expression> {
        let start = self.position;
        let op = match self.current().kind {
            TokenKind::Less => ComparisonOperator::LessThan,
            TokenKind::LessEqual => ComparisonOperator::LessThanOrEqual,
            TokenKind::Greater => ComparisonOperator::GreaterThan,
            TokenKind::GreaterEqual => ComparisonOperator::GreaterThanOrEqual,
            TokenKind::Equal => ComparisonOperator::Equal,
            TokenKind::NotEqual => ComparisonOperator::NotEqual,
            _ => return self.parse_expression(),
        };
        self.advance();
        let operand = self.parse_additive()?;
        Ok(Expression::UnaryComparison {
            op,
            operand: Box::new(operand),
            span: self.span_from(start),
        })
    }

    // =========================================================================
    // EXPRESSIONS
    // =========================================================================

    fn parse_expression(&mut self) -> ParseResult<Expression> {
        self.parse_or()
    }

    /// Parse or expression
    fn parse_or(&mut self) -> ParseResult<Expression> {
        let start = self.position;
        let mut left = self.parse_and()?;

        while self.check(&TokenKind::Or) {
            self.advance();
            let right = self.parse_and()?;
            left = Expression::Logical {
                op: LogicalOperator::Or,
                left: Box::new(left),
                right: Box::new(right),
                span: self.span_from(start),
            };
        }

        Ok(left)
    }

    /// Parse and expression
    fn parse_and(&mut self) -> ParseResult<Expression> {
        let start = self.position;
        let mut left = self.parse_comparison()?;

        while self.check(&TokenKind::And) {
            self.advance();
            let right = self.parse_comparison()?;
            left = Expression::Logical {
                op: LogicalOperator::And,
                left: Box::new(left),
                right: Box::new(right),
                span: self.span_from(start),
            };
        }

        Ok(left)
    }

    /// Parse comparison, `between`, `in` and `instance of`
    fn parse_comparison(&mut self) -> ParseResult<Expression> {
        let start = self.position;
        let mut left = self.parse_additive()?;

        loop {
            let op = match self.current().kind {
                TokenKind::Equal => Some(ComparisonOperator::Equal),
                TokenKind::NotEqual => Some(ComparisonOperator::NotEqual),
                TokenKind::Less => Some(ComparisonOperator::LessThan),
                TokenKind::LessEqual => Some(ComparisonOperator::LessThanOrEqual),
                TokenKind::Greater => Some(ComparisonOperator::GreaterThan),
                TokenKind::GreaterEqual => Some(ComparisonOperator::GreaterThanOrEqual),
                _ => None,
            };

            left = if let Some(op) = op {
                self.advance();
                let right = self.parse_additive()?;
                Expression::Comparison {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                    span: self.span_from(start),
                }
            } else if self.check(&TokenKind::Between) {
                self.advance();
                let low = self.parse_additive()?;
                self.expect(&TokenKind::And)?;
                let high = self.parse_additive()?;
                Expression::Between {
                    value: Box::new(left),
                    low: Box::new(low),
                    high: Box::new(high),
                    span: self.span_from(start),
                }
            } else if self.check(&TokenKind::In) {
                self.advance();
                let tests = self.parse_in_tests()?;
                Expression::In {
                    value: Box::new(left),
                    tests,
                    span: self.span_from(start),
                }
            } else if self.check(&TokenKind::Instance) {
                self.advance();
                self.expect(&TokenKind::Of)?;
                let type_ref = self.parse_type()?;
                Expression::InstanceOf {
                    value: Box::new(left),
                    type_ref,
                    span: self.span_from(start),
                }
            } else {
                break;
            };
        }

        Ok(left)
    }

    /// Right-hand side of `in`: one positive unary test or a parenthesized list
    fn parse_in_tests(&mut self) -> ParseResult<Vec<Expression>> {
        if self.check(&TokenKind::LeftParen) {
            let saved = self.save();
            match self.parse_test_list() {
                Ok(tests) => return Ok(tests),
                Err(_) => self.restore(saved),
            }
        }
        Ok(vec![self.parse_positive_unary_test()?])
    }

    fn parse_test_list(&mut self) -> ParseResult<Vec<Expression>> {
        self.enter("unary tests");
        self.advance();
        let mut tests = vec![self.parse_positive_unary_test()?];
        while self.check(&TokenKind::Comma) {
            self.advance();
            tests.push(self.parse_positive_unary_test()?);
        }
        self.expect(&TokenKind::RightParen)?;
        self.leave();
        Ok(tests)
    }

    /// Parse addition/subtraction
    fn parse_additive(&mut self) -> ParseResult<Expression> {
        let start = self.position;
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match self.current().kind {
                TokenKind::Plus => ArithmeticOperator::Add,
                TokenKind::Minus => ArithmeticOperator::Subtract,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expression::Arithmetic {
                op,
                left: Box::new(left),
                right: Box::new(right),
                span: self.span_from(start),
            };
        }

        Ok(left)
    }

    /// Parse multiplication/division
    fn parse_multiplicative(&mut self) -> ParseResult<Expression> {
        let start = self.position;
        let mut left = self.parse_power()?;

        loop {
            let op = match self.current().kind {
                TokenKind::Star => ArithmeticOperator::Multiply,
                TokenKind::Slash => ArithmeticOperator::Divide,
                _ => break,
            };
            self.advance();
            let right = self.parse_power()?;
            left = Expression::Arithmetic {
                op,
                left: Box::new(left),
                right: Box::new(right),
                span: self.span_from(start),
            };
        }

        Ok(left)
    }

    /// Parse exponentiation
    fn parse_power(&mut self) -> ParseResult<Expression> {
        let start = self.position;
        let mut left = self.parse_unary()?;

        while self.check(&TokenKind::StarStar) {
            self.advance();
            let right = self.parse_unary()?;
            left = Expression::Arithmetic {
                op: ArithmeticOperator::Power,
                left: Box::new(left),
                right: Box::new(right),
                span: self.span_from(start),
            };
        }

        Ok(left)
    }

    /// Parse arithmetic negation
    fn parse_unary(&mut self) -> ParseResult<Expression> {
        let start = self.position;

        if self.check(&TokenKind::Minus) {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(Expression::Negation {
                operand: Box::new(operand),
                span: self.span_from(start),
            });
        }

        self.parse_postfix()
    }

    /// Parse postfix expressions (path, filter, invocation)
    fn parse_postfix(&mut self) -> ParseResult<Expression> {
        let start = self.position;
        let mut expr = self.parse_primary()?;

        loop {
            expr = match self.current().kind {
                TokenKind::Dot => {
                    self.advance();
                    let (property, _) = self.parse_name()?;
                    Expression::Path {
                        object: Box::new(expr),
                        property,
                        span: self.span_from(start),
                    }
                }
                TokenKind::LeftBracket if self.in_interval_end => {
                    // `[` after an end bound closes the interval unless a filter follows
                    let saved = self.save();
                    match self.parse_filter() {
                        Ok(selector) => Expression::Filter {
                            object: Box::new(expr),
                            selector: Box::new(selector),
                            span: self.span_from(start),
                        },
                        Err(_) => {
                            self.restore(saved);
                            break;
                        }
                    }
                }
                TokenKind::LeftBracket => {
                    let selector = self.parse_filter()?;
                    Expression::Filter {
                        object: Box::new(expr),
                        selector: Box::new(selector),
                        span: self.span_from(start),
                    }
                }
                TokenKind::LeftParen => {
                    self.enter("function invocation");
                    self.advance();
                    let args = self.parse_arguments()?;
                    self.expect(&TokenKind::RightParen)?;
                    self.leave();
                    Expression::Invocation {
                        callee: Box::new(expr),
                        args,
                        span: self.span_from(start),
                    }
                }
                _ => break,
            };
        }

        Ok(expr)
    }

    /// `[selector]` after a postfix target
    fn parse_filter(&mut self) -> ParseResult<Expression> {
        self.enter("filter expression");
        self.advance();
        let selector = self.parse_expression()?;
        self.expect(&TokenKind::RightBracket)?;
        self.leave();
        Ok(selector)
    }

    fn parse_arguments(&mut self) -> ParseResult<Arguments> {
        if self.check(&TokenKind::RightParen) {
            return Ok(Arguments::Positional(Vec::new()));
        }

        if self.at_named_argument() {
            let mut named = Vec::new();
            loop {
                let (name, _) = self.parse_name()?;
                self.expect(&TokenKind::Colon)?;
                named.push((name, self.parse_expression()?));
                if !self.check(&TokenKind::Comma) {
                    break;
                }
                self.advance();
            }
            return Ok(Arguments::Named(named));
        }

        let mut positional = vec![self.parse_expression()?];
        while self.check(&TokenKind::Comma) {
            self.advance();
            positional.push(self.parse_expression()?);
        }
        Ok(Arguments::Positional(positional))
    }

    fn at_named_argument(&mut self) -> bool {
        let saved = self.save();
        let named = self.parse_name().is_ok() && self.check(&TokenKind::Colon);
        self.restore(saved);
        named
    }

    /// Parse primary expressions
    fn parse_primary(&mut self) -> ParseResult<Expression> {
        let start = self.position;
        let span = self.current_span();

        match self.current().kind.clone() {
            TokenKind::Number(value) => {
                self.advance();
                Ok(Expression::Number { value, span })
            }
            TokenKind::String(value) => {
                self.advance();
                Ok(Expression::String { value, span })
            }
            TokenKind::True | TokenKind::False => {
                let value = self.check(&TokenKind::True);
                self.advance();
                Ok(Expression::Boolean { value, span })
            }
            TokenKind::Null => {
                self.advance();
                Ok(Expression::Null { span })
            }
            TokenKind::At => {
                self.advance();
                match self.current().kind.clone() {
                    TokenKind::String(text) => {
                        self.advance();
                        Ok(Expression::Temporal {
                            text,
                            span: self.span_from(start),
                        })
                    }
                    _ => Err(self.error()),
                }
            }
            TokenKind::Question => {
                self.advance();
                Ok(Expression::InputValue { span })
            }
            TokenKind::LeftBracket => self.parse_list_or_interval(),
            TokenKind::RightBracket => {
                self.enter("interval");
                self.advance();
                let first = self.parse_expression()?;
                let interval = self.finish_interval(start, first, false)?;
                self.leave();
                Ok(interval)
            }
            TokenKind::LeftParen => self.parse_paren_or_interval(),
            TokenKind::LeftBrace => self.parse_context(),
            TokenKind::If => self.parse_if_expr(),
            TokenKind::For => self.parse_for_expr(),
            TokenKind::Some | TokenKind::Every => self.parse_quantified_expr(),
            TokenKind::Function => self.parse_function_definition(),
            TokenKind::Name(_) | TokenKind::And | TokenKind::Or => {
                let (name, span) = self.parse_name()?;
                Ok(Expression::Name { name, span })
            }
            _ => Err(self.error()),
        }
    }

    /// `[a, b, c]` or `[a..b]`, `[a..b)`, `[a..b[`
    fn parse_list_or_interval(&mut self) -> ParseResult<Expression> {
        let start = self.position;
        self.enter("list");
        self.advance();

        if self.check(&TokenKind::RightBracket) {
            self.advance();
            self.leave();
            return Ok(Expression::List {
                elements: Vec::new(),
                span: self.span_from(start),
            });
        }

        let first = self.parse_expression()?;
        if self.check(&TokenKind::DotDot) {
            self.leave();
            self.enter("interval");
            let interval = self.finish_interval(start, first, true)?;
            self.leave();
            return Ok(interval);
        }

        let mut elements = vec![first];
        while self.check(&TokenKind::Comma) {
            self.advance();
            elements.push(self.parse_expression()?);
        }
        self.expect(&TokenKind::RightBracket)?;
        self.leave();

        Ok(Expression::List {
            elements,
            span: self.span_from(start),
        })
    }

    /// `(expr)` or `(a..b)`, `(a..b]`
    fn parse_paren_or_interval(&mut self) -> ParseResult<Expression> {
        let start = self.position;
        self.enter("parenthesized expression");
        self.advance();

        let inner = self.parse_expression()?;
        if self.check(&TokenKind::DotDot) {
            self.leave();
            self.enter("interval");
            let interval = self.finish_interval(start, inner, false)?;
            self.leave();
            return Ok(interval);
        }

        self.expect(&TokenKind::RightParen)?;
        self.leave();
        Ok(inner)
    }

    /// Parse `..end` and the closing bracket of an interval
    fn finish_interval(
        &mut self,
        start: usize,
        first: Expression,
        start_included: bool,
    ) -> ParseResult<Expression> {
        self.expect(&TokenKind::DotDot)?;
        let outer = std::mem::replace(&mut self.in_interval_end, true);
        let end = self.parse_expression();
        self.in_interval_end = outer;
        let end = end?;
        let end_included = match self.current().kind {
            TokenKind::RightBracket => true,
            TokenKind::RightParen | TokenKind::LeftBracket => false,
            _ => return Err(self.error()),
        };
        self.advance();
        Ok(Expression::Interval {
            start: Box::new(first),
            end: Box::new(end),
            start_included,
            end_included,
            span: self.span_from(start),
        })
    }

    /// `{key: value, "other key": value}`; later entries see earlier keys
    fn parse_context(&mut self) -> ParseResult<Expression> {
        let start = self.position;
        self.enter("context");
        self.advance();

        let mut entries = Vec::new();
        if !self.check(&TokenKind::RightBrace) {
            loop {
                let key = self.parse_context_key()?;
                self.expect(&TokenKind::Colon)?;
                let value = self.parse_expression()?;
                self.scoped_names.push(key.clone());
                entries.push(ContextEntry { key, value });
                if !self.check(&TokenKind::Comma) {
                    break;
                }
                self.advance();
            }
        }
        self.expect(&TokenKind::RightBrace)?;
        self.leave();

        Ok(Expression::Context {
            entries,
            span: self.span_from(start),
        })
    }

    fn parse_context_key(&mut self) -> ParseResult<String> {
        if let TokenKind::String(key) = &self.current().kind {
            let key = key.clone();
            self.advance();
            return Ok(key);
        }

        let first = self.position;
        while !matches!(
            self.current().kind,
            TokenKind::Colon | TokenKind::Comma | TokenKind::RightBrace | TokenKind::Eof
        ) {
            if matches!(self.current().kind, TokenKind::Unknown(_)) {
                self.consumed_unknown.push(self.position);
            }
            self.advance();
        }
        if first == self.position {
            return Err(self.error());
        }

        let from = self.tokens[first].span.start;
        let to = self.tokens[self.position - 1].span.end;
        Ok(self.source[from..to].split_whitespace().collect::<Vec<_>>().join(" "))
    }

    /// Parse if expression: if c then a [else b]
    fn parse_if_expr(&mut self) -> ParseResult<Expression> {
        let start = self.position;
        self.enter("if expression");
        self.expect(&TokenKind::If)?;

        let condition = self.parse_expression()?;
        self.expect(&TokenKind::Then)?;
        let then_expr = self.parse_expression()?;
        let else_expr = if self.check(&TokenKind::Else) {
            self.advance();
            Some(Box::new(self.parse_expression()?))
        } else {
            None
        };
        self.leave();

        Ok(Expression::If {
            condition: Box::new(condition),
            then_expr: Box::new(then_expr),
            else_expr,
            span: self.span_from(start),
        })
    }

    /// Parse for expression: for i in xs, j in 1..3 return body
    fn parse_for_expr(&mut self) -> ParseResult<Expression> {
        let start = self.position;
        self.enter("for expression");
        self.expect(&TokenKind::For)?;

        let iterations = self.parse_iterations()?;
        self.expect(&TokenKind::Return)?;
        let body = self.parse_expression()?;
        self.leave();

        Ok(Expression::For {
            iterations,
            body: Box::new(body),
            span: self.span_from(start),
        })
    }

    /// Parse quantified expression: some/every x in xs satisfies c
    fn parse_quantified_expr(&mut self) -> ParseResult<Expression> {
        let start = self.position;
        self.enter("quantified expression");
        let quantifier = if self.check(&TokenKind::Some) {
            Quantifier::Some
        } else {
            Quantifier::Every
        };
        self.advance();

        let iterations = self.parse_iterations()?;
        self.expect(&TokenKind::Satisfies)?;
        let condition = self.parse_expression()?;
        self.leave();

        Ok(Expression::Quantified {
            quantifier,
            iterations,
            condition: Box::new(condition),
            span: self.span_from(start),
        })
    }

    fn parse_iterations(&mut self) -> ParseResult<Vec<Iteration>> {
        let mut iterations = Vec::new();
        loop {
            let (name, _) = self.parse_name()?;
            self.scoped_names.push(name.clone());
            self.expect(&TokenKind::In)?;
            let first = self.parse_expression()?;
            let source = if self.check(&TokenKind::DotDot) {
                self.advance();
                let end = self.parse_expression()?;
                IterationSource::Range { start: first, end }
            } else {
                IterationSource::Expression(first)
            };
            iterations.push(Iteration { name, source });

            if !self.check(&TokenKind::Comma) {
                break;
            }
            self.advance();
        }
        Ok(iterations)
    }

    /// Parse function definition: function(a, b: number) body
    fn parse_function_definition(&mut self) -> ParseResult<Expression> {
        let start = self.position;
        self.enter("function definition");
        self.expect(&TokenKind::Function)?;
        self.expect(&TokenKind::LeftParen)?;

        let mut params = Vec::new();
        if !self.check(&TokenKind::RightParen) {
            loop {
                let (name, _) = self.parse_name()?;
                if self.check(&TokenKind::Colon) {
                    self.advance();
                    self.parse_type()?;
                }
                self.scoped_names.push(name.clone());
                params.push(name);
                if !self.check(&TokenKind::Comma) {
                    break;
                }
                self.advance();
            }
        }
        self.expect(&TokenKind::RightParen)?;

        let body = self.parse_expression()?;
        self.leave();

        Ok(Expression::FunctionDefinition {
            params,
            body: Box::new(body),
            span: self.span_from(start),
        })
    }

    /// Parse a type reference: `number`, `list<string>`, `context<a: number>`,
    /// `function<number> -> boolean`
    fn parse_type(&mut self) -> ParseResult<TypeRef> {
        self.enter("type reference");
        let name = match self.current().kind {
            TokenKind::Function => {
                self.advance();
                "function".to_string()
            }
            TokenKind::Null => {
                self.advance();
                "Null".to_string()
            }
            _ => self.parse_name()?.0,
        };

        let parameterized = self.check(&TokenKind::Less);
        let type_ref = match name.as_str() {
            "list" | "range" if parameterized => {
                self.advance();
                let element = Box::new(self.parse_type()?);
                self.expect(&TokenKind::Greater)?;
                if name == "list" {
                    TypeRef::List(element)
                } else {
                    TypeRef::Range(element)
                }
            }
            "context" if parameterized => {
                self.advance();
                let mut entries = Vec::new();
                loop {
                    let (key, _) = self.parse_name()?;
                    self.expect(&TokenKind::Colon)?;
                    entries.push((key, self.parse_type()?));
                    if !self.check(&TokenKind::Comma) {
                        break;
                    }
                    self.advance();
                }
                self.expect(&TokenKind::Greater)?;
                TypeRef::Context(entries)
            }
            "function" if parameterized => {
                self.advance();
                let mut params = Vec::new();
                if !self.check(&TokenKind::Greater) {
                    loop {
                        params.push(self.parse_type()?);
                        if !self.check(&TokenKind::Comma) {
                            break;
                        }
                        self.advance();
                    }
                }
                self.expect(&TokenKind::Greater)?;
                self.expect(&TokenKind::Minus)?;
                self.expect(&TokenKind::Greater)?;
                TypeRef::Function(params, Box::new(self.parse_type()?))
            }
            other => TypeRef::from_name(other),
        };
        self.leave();
        Ok(type_ref)
    }

    // =========================================================================
    // NAMES
    // =========================================================================

    /// Parse a (possibly multi-word) name
    fn parse_name(&mut self) -> ParseResult<(String, SourceSpan)> {
        let start = self.position;
        match &self.current().kind {
            TokenKind::And | TokenKind::Or if self.check_at(1, &TokenKind::LeftParen) => {
                let name = self.current().span.text.clone();
                self.advance();
                return Ok((name, self.span_from(start)));
            }
            TokenKind::Name(_) => {}
            _ => return Err(self.error()),
        }

        if let Some((name, end)) = self.match_known_name() {
            if end > self.position + 1 {
                tracing::trace!(name = %name, "matched multi-word name");
                for index in self.position..end {
                    if matches!(self.tokens[index].kind, TokenKind::Unknown(_)) {
                        self.consumed_unknown.push(index);
                    }
                }
                self.position = end;
                return Ok((name, self.span_from(start)));
            }
        }

        let mut parts = Vec::new();
        while let TokenKind::Name(part) = &self.current().kind {
            parts.push(part.clone());
            self.advance();
        }
        Ok((parts.join(" "), self.span_from(start)))
    }

    /// Longest known name matching the source at the current token and
    /// ending on a token boundary; returns the name and the index of the
    /// first token after it
    fn match_known_name(&self) -> Option<(String, usize)> {
        let start = self.current().span.start;
        let rest = &self.source[start..];

        let mut best: Option<(&String, usize, usize)> = None;
        for candidate in self.known_names.iter().chain(self.scoped_names.iter()) {
            let Some(len) = match_name_prefix(rest, candidate) else {
                continue;
            };
            if best.is_some_and(|(_, best_len, _)| best_len >= len) {
                continue;
            }
            let end_offset = start + len;
            let end_index = self.tokens[self.position..]
                .iter()
                .position(|t| t.span.end == end_offset && !matches!(t.kind, TokenKind::Eof));
            if let Some(offset) = end_index {
                best = Some((candidate, len, self.position + offset + 1));
            }
        }

        best.map(|(name, _, end)| (name.clone(), end))
    }

    // =========================================================================
    // HELPERS
    // =========================================================================

    fn current(&self) -> &Token {
        self.peek(0)
    }

    fn peek(&self, n: usize) -> &Token {
        let index = (self.position + n).min(self.tokens.len() - 1);
        &self.tokens[index]
    }

    fn is_at_end(&self) -> bool {
        matches!(self.current().kind, TokenKind::Eof)
    }

    fn advance(&mut self) {
        if !self.is_at_end() {
            self.position += 1;
        }
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.check_at(0, kind)
    }

    fn check_at(&self, n: usize, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.peek(n).kind) == std::mem::discriminant(kind)
    }

    fn expect(&mut self, kind: &TokenKind) -> ParseResult<()> {
        if self.check(kind) {
            self.advance();
            Ok(())
        } else {
            Err(self.error())
        }
    }

    fn expect_end(&mut self) -> ParseResult<()> {
        if self.is_at_end() {
            Ok(())
        } else {
            Err(self.error())
        }
    }

    fn enter(&mut self, node: &'static str) {
        let offset = self.current().span.start;
        self.nodes.push((node, offset));
    }

    fn leave(&mut self) {
        self.nodes.pop();
    }

    fn save(&self) -> (usize, usize, usize) {
        (self.position, self.nodes.len(), self.scoped_names.len())
    }

    fn restore(&mut self, (position, nodes, scoped): (usize, usize, usize)) {
        self.position = position;
        self.nodes.truncate(nodes);
        self.scoped_names.truncate(scoped);
    }

    /// Create a SourceSpan from a start token to the last consumed token
    fn span_from(&self, start: usize) -> SourceSpan {
        let from = self.tokens[start.min(self.tokens.len() - 1)].span.start;
        let to = if self.position > start {
            self.tokens[self.position - 1].span.end
        } else {
            from
        };
        SourceSpan::new(from, to)
    }

    fn current_span(&self) -> SourceSpan {
        let span = &self.current().span;
        SourceSpan::new(span.start, span.end)
    }

    /// Error at the current token: unexpected token, or incomplete construct at the end
    fn error(&self) -> SyntaxError {
        let token = self.current();
        if let TokenKind::Unknown(_) = token.kind {
            return self.unrecognized(self.position);
        }

        let (node, node_start) = self.nodes.last().copied().unwrap_or(("expression", 0));
        match token.kind {
            TokenKind::Eof => SyntaxError::incomplete(
                node,
                &self.source[node_start..],
                node_start,
                self.source.len(),
            ),
            _ => SyntaxError::unexpected(&token.span.text, node, token.span.start, token.span.end),
        }
    }

    fn unrecognized(&self, index: usize) -> SyntaxError {
        let span = &self.tokens[index].span;
        // An unterminated string swallows the rest of the input
        let to = if span.text.starts_with('"') {
            self.source.len()
        } else {
            span.end
        };
        SyntaxError::unrecognized(&self.source[span.start..to], span.start, to)
    }

    /// Unrecognized tokens take precedence over any other syntax error
    fn prefer_unrecognized(&self, error: SyntaxError) -> SyntaxError {
        self.tokens
            .iter()
            .enumerate()
            .find(|(i, t)| {
                matches!(t.kind, TokenKind::Unknown(_)) && !self.consumed_unknown.contains(i)
            })
            .map_or(error, |(i, _)| self.unrecognized(i))
    }
}

/// Byte length of the source prefix matching `name`; whitespace in the name
/// matches one or more whitespace characters in the source
fn match_name_prefix(source: &str, name: &str) -> Option<usize> {
    let mut src = source.char_indices().peekable();
    let mut wanted = name.chars().peekable();
    let mut consumed = 0;

    while let Some(c) = wanted.next() {
        if c.is_whitespace() {
            while wanted.peek().is_some_and(|c| c.is_whitespace()) {
                wanted.next();
            }
            let mut matched = false;
            while let Some(&(i, s)) = src.peek() {
                if !s.is_whitespace() {
                    break;
                }
                matched = true;
                consumed = i + s.len_utf8();
                src.next();
            }
            if !matched {
                return None;
            }
        } else {
            let (i, s) = src.next()?;
            if s != c {
                return None;
            }
            consumed = i + s.len_utf8();
        }
    }

    Some(consumed)
}

/// Parse an expression
pub fn parse_expression(source: &str, known_names: Vec<String>) -> ParseResult<Expression> {
    let tokens = crate::lexer::tokenize(source)?;
    TokenParser::new(source, tokens, known_names).parse_expression_root()
}

/// Parse a list of unary tests
pub fn parse_unary_tests(source: &str, known_names: Vec<String>) -> ParseResult<Expression> {
    let tokens = crate::lexer::tokenize(source)?;
    TokenParser::new(source, tokens, known_names).parse_unary_tests_root()
}
