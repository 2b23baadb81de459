use anyhow::{Result, bail};

const MAX_FACTORIAL_INPUT: f64 = 170.0;
const MAX_EXPRESSION_DEPTH: usize = 256;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Name(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    Bang,
    OpenParen,
    CloseParen,
    Comma,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Number(value) => write!(f, "{}", value),
            Token::Name(name) => write!(f, "{}", name),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Percent => write!(f, "%"),
            Token::Caret => write!(f, "^"),
            Token::Bang => write!(f, "!"),
            Token::OpenParen => write!(f, "("),
            Token::CloseParen => write!(f, ")"),
            Token::Comma => write!(f, ","),
        }
    }
}

/// Evaluates a restricted arithmetic expression: `+ - * / % ^`, unary sign,
/// postfix `!`, parentheses, the fixed function table (`sin`, `cos`, `tan`,
/// `asin`, `acos`, `atan`, `sqrt`, `log`, `ln`, `log10`, `factorial`, `abs`,
/// `round`, `pow`) and the constants `pi` and `e`. Nothing outside that
/// table is reachable.
pub fn evaluate(input: &str) -> Result<f64> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        bail!("empty expression");
    }

    let mut parser = Parser { tokens, pos: 0, depth: 0 };
    let value = parser.expression()?;

    if let Some(token) = parser.peek() {
        bail!("unexpected trailing '{}'", token);
    }
    if !value.is_finite() {
        bail!("result is not a finite number");
    }

    Ok(value)
}

/// Renders an evaluation result the way a calculator would: integral values
/// without a decimal point, everything else with Rust's shortest
/// round-tripping float form.
pub fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            _ if c.is_whitespace() => i += 1,
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '%' => {
                tokens.push(Token::Percent);
                i += 1;
            }
            '^' => {
                tokens.push(Token::Caret);
                i += 1;
            }
            '!' => {
                tokens.push(Token::Bang);
                i += 1;
            }
            '(' => {
                tokens.push(Token::OpenParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::CloseParen);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                // An `e`/`E` right after a number is an exponent marker only
                // when a (signed) digit follows; otherwise it is the constant.
                if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                    let mut j = i + 1;
                    if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                        j += 1;
                    }
                    if j < chars.len() && chars[j].is_ascii_digit() {
                        i = j;
                        while i < chars.len() && chars[i].is_ascii_digit() {
                            i += 1;
                        }
                    }
                }
                let literal: String = chars[start..i].iter().collect();
                match literal.parse::<f64>() {
                    Ok(value) => tokens.push(Token::Number(value)),
                    Err(_) => bail!("invalid number '{}'", literal),
                }
            }
            _ if c.is_ascii_alphabetic() => {
                let start = i;
                while i < chars.len() && chars[i].is_ascii_alphanumeric() {
                    i += 1;
                }
                tokens.push(Token::Name(chars[start..i].iter().collect()));
            }
            _ => bail!("unexpected character '{}'", c),
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token) -> Result<()> {
        if self.eat(&expected) {
            return Ok(());
        }
        match self.peek() {
            Some(token) => bail!("expected '{}', found '{}'", expected, token),
            None => bail!("expected '{}', found end of expression", expected),
        }
    }

    // Every recursion cycle passes through expression() or unary(), so the
    // cap turns runaway nesting into an error instead of a stack overflow.
    fn descend(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_EXPRESSION_DEPTH {
            bail!("expression too deeply nested");
        }
        Ok(())
    }

    fn expression(&mut self) -> Result<f64> {
        self.descend()?;
        let mut value = self.term()?;
        loop {
            if self.eat(&Token::Plus) {
                value += self.term()?;
            } else if self.eat(&Token::Minus) {
                value -= self.term()?;
            } else {
                self.depth -= 1;
                return Ok(value);
            }
        }
    }

    fn term(&mut self) -> Result<f64> {
        let mut value = self.unary()?;
        loop {
            if self.eat(&Token::Star) {
                value *= self.unary()?;
            } else if self.eat(&Token::Slash) {
                let divisor = self.unary()?;
                if divisor == 0.0 {
                    bail!("division by zero");
                }
                value /= divisor;
            } else if self.eat(&Token::Percent) {
                let divisor = self.unary()?;
                if divisor == 0.0 {
                    bail!("modulo by zero");
                }
                // Floored modulo: the result carries the divisor's sign.
                value -= divisor * (value / divisor).floor();
            } else {
                return Ok(value);
            }
        }
    }

    fn unary(&mut self) -> Result<f64> {
        self.descend()?;
        let value = if self.eat(&Token::Minus) {
            -self.unary()?
        } else if self.eat(&Token::Plus) {
            self.unary()?
        } else {
            self.power()?
        };
        self.depth -= 1;
        Ok(value)
    }

    // `^` is right-associative and binds tighter than a leading sign, so
    // -2^2 is -4 while 2^-1 is 0.5.
    fn power(&mut self) -> Result<f64> {
        let base = self.postfix()?;
        if self.eat(&Token::Caret) {
            let exponent = self.unary()?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn postfix(&mut self) -> Result<f64> {
        let mut value = self.primary()?;
        while self.eat(&Token::Bang) {
            value = factorial(value)?;
        }
        Ok(value)
    }

    fn primary(&mut self) -> Result<f64> {
        match self.advance() {
            Some(Token::Number(value)) => Ok(value),
            Some(Token::OpenParen) => {
                let value = self.expression()?;
                self.expect(Token::CloseParen)?;
                Ok(value)
            }
            Some(Token::Name(name)) => {
                if self.eat(&Token::OpenParen) {
                    let args = self.call_args()?;
                    self.expect(Token::CloseParen)?;
                    apply_function(&name, &args)
                } else {
                    constant(&name)
                }
            }
            Some(token) => bail!("unexpected token '{}'", token),
            None => bail!("unexpected end of expression"),
        }
    }

    fn call_args(&mut self) -> Result<Vec<f64>> {
        let mut args = vec![self.expression()?];
        while self.eat(&Token::Comma) {
            args.push(self.expression()?);
        }
        Ok(args)
    }
}

fn constant(name: &str) -> Result<f64> {
    match name {
        "pi" => Ok(std::f64::consts::PI),
        "e" => Ok(std::f64::consts::E),
        _ => bail!("unknown name '{}'", name),
    }
}

fn apply_function(name: &str, args: &[f64]) -> Result<f64> {
    let value = match (name, args) {
        ("sin", [x]) => x.sin(),
        ("cos", [x]) => x.cos(),
        ("tan", [x]) => x.tan(),
        ("asin", [x]) => x.asin(),
        ("acos", [x]) => x.acos(),
        ("atan", [x]) => x.atan(),
        ("sqrt", [x]) => x.sqrt(),
        ("ln", [x]) | ("log", [x]) => x.ln(),
        ("log", [x, base]) => x.log(*base),
        ("log10", [x]) => x.log10(),
        ("abs", [x]) => x.abs(),
        ("round", [x]) => x.round(),
        ("round", [x, digits]) => {
            if digits.fract() != 0.0 {
                bail!("round digits must be an integer");
            }
            let factor = 10f64.powi(*digits as i32);
            (x * factor).round() / factor
        }
        ("factorial", [x]) => factorial(*x)?,
        ("pow", [x, y]) => x.powf(*y),
        (
            "sin" | "cos" | "tan" | "asin" | "acos" | "atan" | "sqrt" | "ln" | "log10" | "abs"
            | "factorial",
            _,
        ) => bail!("{} expects one argument", name),
        ("log" | "round", _) => bail!("{} expects one or two arguments", name),
        ("pow", _) => bail!("pow expects two arguments"),
        _ => bail!("unknown function '{}'", name),
    };
    Ok(value)
}

fn factorial(value: f64) -> Result<f64> {
    if value < 0.0 {
        bail!("factorial of a negative number");
    }
    if value.fract() != 0.0 {
        bail!("factorial of a non-integer");
    }
    if value > MAX_FACTORIAL_INPUT {
        bail!("factorial result is too large");
    }

    let n = value as u64;
    let mut product = 1.0;
    for i in 2..=n {
        product *= i as f64;
    }
    Ok(product)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(input: &str) -> f64 {
        evaluate(input).unwrap()
    }

    fn close(actual: f64, expected: f64) -> bool {
        (actual - expected).abs() < 1e-9
    }

    #[test]
    fn basic_arithmetic() {
        assert_eq!(eval("2+3*4"), 14.0);
        assert_eq!(eval("(2+3)*4"), 20.0);
        assert_eq!(eval("10/4"), 2.5);
        assert_eq!(eval("10 - 2 - 3"), 5.0);
    }

    #[test]
    fn unary_signs() {
        assert_eq!(eval("-5"), -5.0);
        assert_eq!(eval("--5"), 5.0);
        assert_eq!(eval("+5"), 5.0);
        assert_eq!(eval("3 * -2"), -6.0);
    }

    #[test]
    fn power_binds_right() {
        assert_eq!(eval("2^10"), 1024.0);
        assert_eq!(eval("2^3^2"), 512.0);
        assert_eq!(eval("-2^2"), -4.0);
        assert_eq!(eval("2^-1"), 0.5);
    }

    #[test]
    fn modulo_is_floored() {
        assert_eq!(eval("7 % 3"), 1.0);
        assert_eq!(eval("-7 % 3"), 2.0);
        assert_eq!(eval("7 % -3"), -2.0);
        assert_eq!(eval("7.5 % 2"), 1.5);
    }

    #[test]
    fn factorial_postfix() {
        assert_eq!(eval("5!"), 120.0);
        assert_eq!(eval("(3+2)!"), 120.0);
        assert_eq!(eval("3!!"), 720.0);
        assert_eq!(eval("-3!"), -6.0);
        assert_eq!(eval("0!"), 1.0);
        assert_eq!(eval("2^3!"), 64.0);
    }

    #[test]
    fn factorial_rejects_bad_input() {
        assert!(evaluate("3.5!").is_err());
        assert!(evaluate("(-3)!").is_err());
        assert!(evaluate("171!").is_err());
        assert_eq!(eval("factorial(6)"), 720.0);
    }

    #[test]
    fn function_table() {
        assert_eq!(eval("sqrt(16)"), 4.0);
        assert_eq!(eval("abs(-4.5)"), 4.5);
        assert_eq!(eval("round(2.4)"), 2.0);
        assert!(close(eval("round(2.567, 2)"), 2.57));
        assert_eq!(eval("pow(2, 10)"), 1024.0);
        assert!(close(eval("ln(e)"), 1.0));
        assert!(close(eval("log(8, 2)"), 3.0));
        assert!(close(eval("log10(1000)"), 3.0));
        assert!(close(eval("sin(0)"), 0.0));
        assert!(close(eval("sin(pi/2)"), 1.0));
    }

    #[test]
    fn constants() {
        assert!(close(eval("pi"), std::f64::consts::PI));
        assert!(close(eval("2*pi"), 2.0 * std::f64::consts::PI));
        assert!(close(eval("e"), std::f64::consts::E));
    }

    #[test]
    fn number_literals() {
        assert_eq!(eval("1e3"), 1000.0);
        assert_eq!(eval("2.5E-2"), 0.025);
        assert_eq!(eval(".5+.5"), 1.0);
        assert_eq!(eval("2e+1"), 20.0);
    }

    #[test]
    fn bare_e_after_number_is_not_an_exponent() {
        // "2e" is the literal 2 followed by the constant, which is a parse
        // error without an operator between them.
        assert!(evaluate("2e").is_err());
        assert_eq!(eval("2*e"), 2.0 * std::f64::consts::E);
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(evaluate("").is_err());
        assert!(evaluate("   ").is_err());
        assert!(evaluate("2+").is_err());
        assert!(evaluate("2+*3").is_err());
        assert!(evaluate("(2+3").is_err());
        assert!(evaluate("2 2").is_err());
        assert!(evaluate("2pi").is_err());
        assert!(evaluate("()").is_err());
        assert!(evaluate("1.2.3").is_err());
        assert!(evaluate("2 @ 3").is_err());
    }

    #[test]
    fn rejects_unknown_names() {
        let err = evaluate("pie").unwrap_err();
        assert!(err.to_string().contains("unknown name"));
        assert!(evaluate("bogus(1)").is_err());
        assert!(evaluate("PI").is_err());
    }

    #[test]
    fn rejects_bad_arity() {
        assert!(evaluate("pow(2)").is_err());
        assert!(evaluate("sin(1, 2)").is_err());
        assert!(evaluate("log(1, 2, 3)").is_err());
    }

    #[test]
    fn rejects_non_finite_results() {
        assert!(evaluate("1/0").is_err());
        assert!(evaluate("5 % 0").is_err());
        assert!(evaluate("sqrt(-1)").is_err());
        assert!(evaluate("10^10000").is_err());
    }

    #[test]
    fn deep_nesting_errors_instead_of_overflowing() {
        let nested = format!("{}1{}", "(".repeat(100_000), ")".repeat(100_000));
        let err = evaluate(&nested).unwrap_err();
        assert!(err.to_string().contains("too deeply nested"));

        let signs = format!("{}5", "-".repeat(200_000));
        assert!(evaluate(&signs).is_err());

        // Depth is released as groups close, so long flat chains still parse.
        let flat = "(1)+".repeat(300) + "1";
        assert_eq!(eval(&flat), 301.0);

        let shallow = format!("{}42{}", "(".repeat(64), ")".repeat(64));
        assert_eq!(eval(&shallow), 42.0);
    }

    #[test]
    fn formatting() {
        assert_eq!(format_value(5.0), "5");
        assert_eq!(format_value(-4.0), "-4");
        assert_eq!(format_value(2.5), "2.5");
        assert_eq!(format_value(1024.0), "1024");
        assert_eq!(format_value(0.1 + 0.2), "0.30000000000000004");
    }
}
