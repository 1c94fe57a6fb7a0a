//! # XeLaTeX Backend
//!
//! Serializes a [`Token`] stream into XeLaTeX source.
//!
//! Report text is set verbatim in a monospace font, so [`Token::Literal`]
//! becomes `\verb` with a delimiter the text does not contain and needs no
//! escaping. Highlighted spans are set in markup context and go through
//! [`escape_latex`], except underlined spans which are saved verbatim first.

use serde::{Deserialize, Serialize};

use crate::render::{SpanKind, Token};

/// Packages the generated source depends on. They must be installed before
/// the first compiler pass.
pub const REQUIRED_PACKAGES: &[&str] = &[
    "extsizes",
    "l3packages",
    "l3kernel",
    "tipa",
    "ulem",
    "xetex-def",
    "realscripts",
    "metalogo",
    "fancyhdr",
    "xcolor",
    "etoolbox",
    "fancyvrb",
    "hyperref",
];

const MONO_FONT: &str = "@MONO_FONT@";

const PREAMBLE: &str = r"%!TEX TS-program = xelatex
%!TEX encoding = UTF-8 Unicode
\documentclass[9pt]{extarticle}
\usepackage{xltxtra,fontspec,xunicode}
\usepackage[a4paper,includefoot,left=0.8in,right=0.5in,top=0.3in,bottom=0.2in,footskip=.1in]{geometry}
\usepackage{fancyhdr}
\usepackage[russian,english]{babel}
\usepackage[usenames,dvipsnames,svgnames]{xcolor}
\usepackage{etoolbox}
\usepackage[hidelinks, bookmarks=true, unicode=true]{hyperref}
\usepackage[normalem]{ulem}
\usepackage{fancyvrb}
\makeatletter
\preto{\@verbatim}{\topsep=0pt \partopsep=0pt }
\makeatother
\setlength{\parindent}{0in}

\newcommand\invisiblesection[1]{%
  \refstepcounter{section}%
  \addcontentsline{toc}{section}{\protect\numberline{\thesection}#1}%
  \sectionmark{#1}}

\setmonofont{@MONO_FONT@}
\setromanfont{@MONO_FONT@}
\setlength{\fboxsep}{2pt}
\fancypagestyle{plain}{%
\fancyhf{}
\renewcommand{\headrulewidth}{0pt}
\renewcommand{\footrulewidth}{0pt}}
\pagestyle{plain}

\begin{document}
{\fontsize{9pt}{10.5pt}\selectfont
";

/// Candidate `\verb` delimiters, in order of preference.
const VERB_DELIMITERS: &[char] = &['|', '!', '+', '=', '@', ';', ':', '"', '\'', '/'];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LatexOptions {
    /// Font used for both the monospace and the roman family.
    pub mono_font: String,
    /// Footer font size in points.
    pub footer_font_size: u32,
}

impl Default for LatexOptions {
    fn default() -> Self {
        Self {
            mono_font: "Lucida Console".to_string(),
            footer_font_size: 11,
        }
    }
}

/// Escapes characters reserved by LaTeX for use in markup context.
pub fn escape_latex(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str(r"\textbackslash{}"),
            '^' => out.push_str(r"\textasciicircum{}"),
            '~' => out.push_str(r"\textasciitilde{}"),
            '{' | '}' | '$' | '&' | '#' | '_' | '%' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

fn verb_delimiter(text: &str) -> Option<char> {
    VERB_DELIMITERS.iter().copied().find(|d| !text.contains(*d))
}

/// Accumulates XeLaTeX source for a whole document.
pub struct LatexWriter {
    options: LatexOptions,
    out: String,
}

impl LatexWriter {
    /// Starts a document with the preamble already written.
    pub fn new(options: LatexOptions) -> Self {
        let out = PREAMBLE.replace(MONO_FONT, &options.mono_font);
        Self { options, out }
    }

    /// Starts without a preamble, for serializing a token fragment.
    pub fn fragment(options: LatexOptions) -> Self {
        Self {
            options,
            out: String::new(),
        }
    }

    pub fn write_tokens<'a>(&mut self, tokens: impl IntoIterator<Item = &'a Token>) {
        for token in tokens {
            self.write_token(token);
        }
    }

    pub fn write_token(&mut self, token: &Token) {
        match token {
            Token::Footer { header, label } => {
                let size = self.options.footer_font_size;
                let text = escape_latex(&format!("{header} {label}"));
                self.out.push_str(&format!(
                    "\\fancyfoot[C]{{\\fontsize{{{size}}}{{{size}}}\\selectfont {text} \\thepage}}\n"
                ));
            }
            Token::SectionBookmark(label) => {
                self.out
                    .push_str(&format!("\\invisiblesection{{{}}}\n", escape_latex(label)));
            }
            Token::PageCounterReset => self.out.push_str("\\setcounter{page}{1}\n"),
            Token::PageDelimiter => self.out.push_str("\\newpage\n"),
            Token::LineBreak => self.out.push_str("\\\\\n"),
            Token::EndOfDocument => self.out.push_str("\\clearpage}\\end{document}\n"),
            Token::Literal(text) => self.write_verbatim(text),
            Token::FormattedSpan { kind, text } => self.write_span(*kind, text),
        }
    }

    fn write_verbatim(&mut self, text: &str) {
        match verb_delimiter(text) {
            Some(d) => self.out.push_str(&format!("\\verb{d}{text}{d}")),
            None => {
                log::warn!("no free \\verb delimiter for {text:?}, falling back to \\texttt");
                self.out
                    .push_str(&format!("\\texttt{{{}}}", escape_latex(text)));
            }
        }
    }

    fn write_span(&mut self, kind: SpanKind, text: &str) {
        match kind {
            SpanKind::InvertColors => self.out.push_str(&format!(
                "\\hspace{{- \\fboxsep}}\\colorbox{{black}}{{\\color{{white}}{}}}\\hspace{{- \\fboxsep}}",
                escape_latex(text)
            )),
            SpanKind::LargeFont => self
                .out
                .push_str(&format!("{{\\Large {}}}", escape_latex(text))),
            SpanKind::Underline => match verb_delimiter(text) {
                Some(d) => self.out.push_str(&format!(
                    "\\SaveVerb{{UnderlinedVerb}}{d}{text}{d}\\uline{{\\UseVerb{{UnderlinedVerb}}}}"
                )),
                None => self
                    .out
                    .push_str(&format!("\\uline{{{}}}", escape_latex(text))),
            },
        }
    }

    pub fn finish(self) -> String {
        self.out
    }
}

/// Serializes a complete document: preamble plus every token.
pub fn to_latex(tokens: &[Token], options: &LatexOptions) -> String {
    let mut writer = LatexWriter::new(options.clone());
    writer.write_tokens(tokens);
    writer.finish()
}
