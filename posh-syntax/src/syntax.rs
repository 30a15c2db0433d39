//! Abstract syntax tree for the shell command language.
//!
//! AST nodes are built once by the parser and never mutated afterward, with
//! one deliberate exception: a [`HereDoc`]'s `content` is filled in by the
//! `eol` parser once its terminating delimiter line is found, which may be
//! several tokens after the node itself was constructed.

use posh_arith::Expr as ArithExpr;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A lexical name: a variable name, function name, or `for`-loop variable.
pub type Id = String;

/// One part of a [`Word`].
#[derive(Clone, Debug, PartialEq)]
pub enum WordPart {
    /// Literal text with no further expansion.
    Constant(String),
    /// A punctuation character kept as a literal word part (e.g. a `{` that
    /// did not open a brace group).
    Token(String),
    /// `$name`, `$1`, `$@`, `$#`, `$?`, ...
    Variable(VariableRef),
    /// `${name#pattern}` and friends.
    ParameterOp {
        var: VariableRef,
        op: ParamOp,
        pattern: Box<Word>,
    },
    /// `$((expr))`.
    Arithmetic(Rc<ArithExpr>),
    /// `$(...)` or `` `...` ``.
    CommandSubstitution(Box<CommandSequence>),
    /// An unquoted `*` or `**` wildcard sentinel.
    Glob(GlobKind),
    /// A `"..."` section nested inside a larger word, e.g. the middle part
    /// of `foo"bar $x"baz`. The nested [`Word`] has `double_quoted = true`.
    DoubleQuoted(Box<Word>),
}

/// The parameter-expansion operators this grammar supports.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ParamOp {
    /// `#` — shortest-prefix removal.
    Hash,
    /// `##` — longest-prefix removal.
    HashHash,
    /// `%` — shortest-suffix removal.
    Percent,
    /// `%%` — longest-suffix removal.
    PercentPercent,
}

impl fmt::Display for ParamOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ParamOp::Hash => "#",
            ParamOp::HashHash => "##",
            ParamOp::Percent => "%",
            ParamOp::PercentPercent => "%%",
        })
    }
}

/// `*` matches within one path segment; `**` additionally descends
/// recursively into subdirectories.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum GlobKind {
    Star,
    StarStar,
}

/// A reference to a variable, positional parameter, or special parameter.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VariableRef {
    pub name: String,
    /// Whether this reference occurs inside double quotes. A double-quoted
    /// reference never undergoes field splitting or globbing by itself.
    pub double_quoted: bool,
}

/// An ordered sequence of parts that expands to zero or more strings.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Word {
    pub parts: Vec<WordPart>,
    /// Set when the whole word is double-quoted (as opposed to individual
    /// parts being double-quoted, which happens inside an unquoted word that
    /// contains a double-quoted substring).
    pub double_quoted: bool,
}

impl Word {
    pub fn constant(s: impl Into<String>) -> Self {
        Word {
            parts: vec![WordPart::Constant(s.into())],
            double_quoted: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Whether any part of this word is a `*`/`**` glob sentinel that is not
    /// inside double quotes, i.e. whether this word is eligible for globbing.
    pub fn has_unquoted_glob(&self) -> bool {
        !self.double_quoted && self.parts.iter().any(|p| matches!(p, WordPart::Glob(_)))
    }
}

/// A shared, fill-once slot for a here-document's body.
///
/// The parser allocates a handle when it sees `<<TAG`, stores it in the
/// pending notes queue, and builds the [`HereDoc`] AST node carrying a clone
/// of the same handle. When `eol` later finds the line matching `TAG`, it
/// fills the handle; both the notes queue and the AST node observe the same
/// `Rc`, so the back-fill needs no second tree traversal.
#[derive(Clone, Debug, Default)]
pub struct HereDocHandle(Rc<RefCell<Option<Word>>>);

impl HereDocHandle {
    pub fn new() -> Self {
        HereDocHandle(Rc::new(RefCell::new(None)))
    }

    pub fn fill(&self, content: Word) {
        *self.0.borrow_mut() = Some(content);
    }

    pub fn get(&self) -> Option<Word> {
        self.0.borrow().clone()
    }

    pub fn is_filled(&self) -> bool {
        self.0.borrow().is_some()
    }
}

impl PartialEq for HereDocHandle {
    fn eq(&self, other: &Self) -> bool {
        *self.0.borrow() == *other.0.borrow()
    }
}

/// A here-document body, one-shot back-filled after construction.
#[derive(Clone, Debug, PartialEq)]
pub struct HereDoc {
    /// The delimiter text (`TAG` in `<<TAG`).
    pub end: String,
    /// Whether the delimiter was quoted, disabling expansion of the body.
    pub quoted: bool,
    pub content: HereDocHandle,
}

/// The source fd of a `N<&m` / `N>&m` duplication, or `-` to close `N`.
#[derive(Clone, Debug, PartialEq)]
pub enum DupTarget {
    Fd(Word),
    Close,
}

/// The effect a [`Redirect`] has on its target file descriptor.
#[derive(Clone, Debug, PartialEq)]
pub enum RedirectBody {
    /// `N<file`
    From(Word),
    /// `N>file`
    To(Word),
    /// `N>>file`
    Append(Word),
    /// `N<&m` / `N<&-`
    DupIn(DupTarget),
    /// `N>&m` / `N>&-`
    DupOut(DupTarget),
    /// `N<<[-]TAG` / `N<<'TAG'`
    Here(HereDoc),
}

/// A single redirection, e.g. `2>&1` or `<<EOF`.
#[derive(Clone, Debug, PartialEq)]
pub struct Redirect {
    pub fd: i32,
    pub body: RedirectBody,
}

/// An assignment word at the head of a simple command, e.g. `x=1` in
/// `x=1 echo $x`.
#[derive(Clone, Debug, PartialEq)]
pub struct Assign {
    pub name: Id,
    pub value: Word,
}

/// A simple command: words, leading assignments, and redirects.
///
/// A command with no words, assignments, or redirects is *null* and is
/// elided by its enclosing [`CommandPipe`]/[`CommandSequence`] at
/// construction time.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Command {
    pub assigns: Vec<Assign>,
    pub words: Vec<Word>,
    pub redirects: Vec<Redirect>,
}

impl Command {
    pub fn is_null(&self) -> bool {
        self.assigns.is_empty() && self.words.is_empty() && self.redirects.is_empty()
    }
}

/// A compound command: a simple command or one of the control constructs.
/// This is the unit a [`CommandPipe`] pipes between.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Simple(Command),
    Brace(CommandSequence),
    If(If),
    While(While),
    For(For),
    Case(Case),
    FunctionDef(Function),
}

/// An ordered list of [`Node`]s piped together: `a | b | c`.
///
/// A pipe of one node is just that node run directly, with no fork; see
/// `posh-semantics`'s execution engine for the pipe/no-pipe distinction.
#[derive(Clone, Debug, PartialEq)]
pub struct CommandPipe {
    pub units: Vec<Node>,
}

/// An ordered list of pipelines run in sequence: `a; b; c` or `a\nb\nc`.
/// Empty pipelines (all of whose commands were null) are elided at
/// construction.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CommandSequence {
    pub units: Vec<CommandPipe>,
}

/// One `condition; then; body` arm of an [`If`], or the final `else` arm
/// (whose condition is [`Condition::Otherwise`]).
#[derive(Clone, Debug, PartialEq)]
pub enum Condition {
    Test(CommandSequence),
    Otherwise,
}

#[derive(Clone, Debug, PartialEq)]
pub struct If {
    pub arms: Vec<(Condition, CommandSequence)>,
    pub redirects: Vec<Redirect>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct While {
    pub condition: CommandSequence,
    pub body: CommandSequence,
    pub redirects: Vec<Redirect>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct For {
    pub var: Id,
    /// `None` when the source omitted `in WORDS`, defaulting to `$@`.
    pub words: Option<Vec<Word>>,
    pub body: CommandSequence,
    pub redirects: Vec<Redirect>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CaseClause {
    pub patterns: Vec<Word>,
    pub body: CommandSequence,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Case {
    pub subject: Word,
    pub clauses: Vec<CaseClause>,
    pub redirects: Vec<Redirect>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Function {
    pub name: Id,
    pub body: Rc<CommandSequence>,
}

// --- Display: renders an AST back to source text for the round-trip
// property tests below. Here-document bodies are rendered as their
// introducing operator only, matching the convention that `Display` never
// reproduces heredoc content (there would be no single-line way to do so).

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.double_quoted {
            write!(f, "\"")?;
        }
        for part in &self.parts {
            write!(f, "{part}")?;
        }
        if self.double_quoted {
            write!(f, "\"")?;
        }
        Ok(())
    }
}

impl fmt::Display for WordPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WordPart::Constant(s) | WordPart::Token(s) => f.write_str(s),
            WordPart::Variable(v) => write!(f, "${}", v.name),
            WordPart::ParameterOp { var, op, pattern } => {
                write!(f, "${{{}{op}{pattern}}}", var.name)
            }
            WordPart::Arithmetic(_) => write!(f, "$((...))"),
            WordPart::CommandSubstitution(seq) => write!(f, "$({seq})"),
            WordPart::Glob(GlobKind::Star) => write!(f, "*"),
            WordPart::Glob(GlobKind::StarStar) => write!(f, "**"),
            WordPart::DoubleQuoted(w) => write!(f, "{w}"),
        }
    }
}

impl fmt::Display for Assign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

impl fmt::Display for Redirect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.body {
            RedirectBody::From(w) => write!(f, "{}<{w}", self.fd),
            RedirectBody::To(w) => write!(f, "{}>{w}", self.fd),
            RedirectBody::Append(w) => write!(f, "{}>>{w}", self.fd),
            RedirectBody::DupIn(DupTarget::Fd(w)) => write!(f, "{}<&{w}", self.fd),
            RedirectBody::DupIn(DupTarget::Close) => write!(f, "{}<&-", self.fd),
            RedirectBody::DupOut(DupTarget::Fd(w)) => write!(f, "{}>&{w}", self.fd),
            RedirectBody::DupOut(DupTarget::Close) => write!(f, "{}>&-", self.fd),
            RedirectBody::Here(h) => write!(f, "{}<<{}", self.fd, h.end),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for a in &self.assigns {
            if !first {
                write!(f, " ")?;
            }
            write!(f, "{a}")?;
            first = false;
        }
        for w in &self.words {
            if !first {
                write!(f, " ")?;
            }
            write!(f, "{w}")?;
            first = false;
        }
        for r in &self.redirects {
            if !first {
                write!(f, " ")?;
            }
            write!(f, "{r}")?;
            first = false;
        }
        Ok(())
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Simple(c) => write!(f, "{c}"),
            Node::Brace(seq) => write!(f, "{{ {seq}; }}"),
            Node::If(n) => write!(f, "{n}"),
            Node::While(n) => write!(f, "{n}"),
            Node::For(n) => write!(f, "{n}"),
            Node::Case(n) => write!(f, "{n}"),
            Node::FunctionDef(n) => write!(f, "{n}"),
        }
    }
}

impl fmt::Display for CommandPipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let strs: Vec<String> = self.units.iter().map(|u| u.to_string()).collect();
        write!(f, "{}", strs.join(" | "))
    }
}

impl fmt::Display for CommandSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let strs: Vec<String> = self.units.iter().map(|u| u.to_string()).collect();
        write!(f, "{}", strs.join("; "))
    }
}

fn fmt_redirects(f: &mut fmt::Formatter<'_>, redirects: &[Redirect]) -> fmt::Result {
    for r in redirects {
        write!(f, " {r}")?;
    }
    Ok(())
}

impl fmt::Display for If {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "if")?;
        for (i, (cond, body)) in self.arms.iter().enumerate() {
            match cond {
                Condition::Test(c) => {
                    let kw = if i == 0 { "" } else { " elif" };
                    write!(f, "{kw} {c}; then {body};")?;
                }
                Condition::Otherwise => write!(f, " else {body};")?,
            }
        }
        write!(f, " fi")?;
        fmt_redirects(f, &self.redirects)
    }
}

impl fmt::Display for While {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "while {}; do {}; done", self.condition, self.body)?;
        fmt_redirects(f, &self.redirects)
    }
}

impl fmt::Display for For {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "for {}", self.var)?;
        if let Some(words) = &self.words {
            let strs: Vec<String> = words.iter().map(|w| w.to_string()).collect();
            write!(f, " in {}", strs.join(" "))?;
        }
        write!(f, "; do {}; done", self.body)?;
        fmt_redirects(f, &self.redirects)
    }
}

impl fmt::Display for Case {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "case {} in", self.subject)?;
        for clause in &self.clauses {
            let pats: Vec<String> = clause.patterns.iter().map(|p| p.to_string()).collect();
            write!(f, " {}) {};;", pats.join(" | "), clause.body)?;
        }
        write!(f, " esac")?;
        fmt_redirects(f, &self.redirects)
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}() {{ {}; }}", self.name, self.body)
    }
}
