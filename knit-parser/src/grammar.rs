//! PEG rules shared by the option tokenizer, the fence matchers and the cell
//! marker detector.
//!
//! Every header rule works on a single line with its terminator already
//! removed, and returns the raw text between the braces so callers can run it
//! through the option normalizer.
use crate::chunk::Token;

pub(crate) type BlockCommentPair<'input> = (&'input str, &'input str);

fn is_space(c: char) -> bool {
    c.is_whitespace() && c != '\r' && c != '\n'
}

fn is_word(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_key_start(c: char) -> bool {
    is_word(c) && !c.is_numeric()
}

fn is_key_char(c: char) -> bool {
    is_word(c) || c == '-'
}

fn is_value_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, ',' | '{' | '}')
}

fn is_value_start(c: char) -> bool {
    is_value_char(c) && !matches!(c, '"' | '\'')
}

peg::parser! {
    pub(crate) grammar chunk_grammar() for str {
        pub(crate) rule tokens() -> Vec<Token>
            = t:token()* ![_] { t }

        rule token() -> Token
            = t:$(kwarg()) { Token::kwarg(t) }
            / t:$("."? key()) { Token::arg(t) }
            / t:$(delimiter()) { Token::delimiter(t) }

        pub(crate) rule kwarg() -> (&'input str, &'input str)
            = k:$(key()) _ "=" _ v:$(value()) { (k, v) }

        pub(crate) rule identifier()
            = key() ![_]

        rule delimiter()
            = _ "," _
            / space()+

        // A name never ends in `.`, inner dots are fine (`fig.cap`)
        rule key()
            = [c if is_key_start(c)] ("."* [c if is_key_char(c)])*

        rule value()
            = "\"" [c if c != '"']* "\""
            / "'" [c if c != '\'']* "'"
            / [c if is_value_start(c)] [c if is_value_char(c)]*

        rule space()
            = [c if is_space(c)]

        rule _
            = space()*

        rule braced() -> &'input str
            = "{" _ body:$(lead() (_ "," _ item())*) _ "}" { body }

        rule lead()
            = kwarg() / key()

        rule item()
            = key() (_ "=" _ value())?

        /// `@{python, setup}` decorator line placed above a plain fence
        pub(crate) rule decorator() -> &'input str
            = "@" body:braced() _ ![_] { body }

        /// "```" optionally followed by a language name
        pub(crate) rule plain_fence() -> Option<&'input str>
            = "```" _ lang:$(key())? _ ![_] { lang }

        /// "```{r, setup}" style fence
        pub(crate) rule braced_fence() -> &'input str
            = "```" _ body:braced() _ ![_] { body }

        /// What follows the comment token on a cell marker line
        pub(crate) rule cell_marker() -> Option<&'input str>
            = " "* "%%" " " body:braced() trailer() ![_] { Some(body) }
            / " "* "%%" trailer() ![_] { None }

        /// The first cell marker may also declare a block comment pair
        pub(crate) rule first_cell_marker() -> (Option<&'input str>, Option<BlockCommentPair<'input>>)
            = " "* "%%" " " body:braced() pair:block_comment() trailer() ![_] { (Some(body), Some(pair)) }
            / " "* "%%" " " body:braced() trailer() ![_] { (Some(body), None) }
            / " "* "%%" pair:block_comment() trailer() ![_] { (None, Some(pair)) }
            / " "* "%%" trailer() ![_] { (None, None) }

        rule block_comment() -> BlockCommentPair<'input>
            = " " begin:$(visible()*<1,6>) " %%% " end:$(visible()*<1,6>) { (begin, end) }

        rule visible()
            = [c if !c.is_whitespace()]

        rule trailer()
            = (" " [_]*)?
    }
}
