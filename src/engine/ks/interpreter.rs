use crate::engine::RenderAccessors;
use crate::types::RenderContext;

use super::parser::{Label, Tag, Token};

/// Tokens that move the story forward. Everything else is ignored.
const ADVANCE_TOKENS: &[&str] = &[
    "Enter",
    " ",
    "ArrowRight",
    "ArrowDown",
    "PageDown",
    crate::types::POINTER_ADVANCE,
];

pub fn is_advance(token: &str) -> bool {
    ADVANCE_TOKENS.contains(&token)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wait {
    Line,
    Page,
}

/// Script state: where evaluation stopped and what is on screen.
#[derive(Debug)]
pub struct Interpreter {
    tokens: Vec<Token>,
    cursor: usize,
    label: Option<Label>,
    text: Vec<String>,
    scene: Vec<String>,
    waiting: Option<Wait>,
}

impl Interpreter {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            cursor: 0,
            label: None,
            text: Vec::new(),
            scene: Vec::new(),
            waiting: None,
        }
    }

    /// Evaluate tokens until the next `lr`/`pg` wait or the end of the script.
    pub fn run(&mut self) {
        self.waiting = None;
        while let Some(token) = self.tokens.get(self.cursor) {
            self.cursor += 1;
            match token {
                Token::Label(label) => {
                    tracing::debug!(label = %label.label, heading = %label.heading, "entering label");
                    self.label = Some(label.clone());
                }
                Token::Text { text } => self.text.push(text.clone()),
                Token::Tag(tag) => match tag.name.as_str() {
                    "lr" => {
                        self.waiting = Some(Wait::Line);
                        return;
                    }
                    "pg" => {
                        self.waiting = Some(Wait::Page);
                        return;
                    }
                    "bg" | "image" => {
                        if let Some(storage) = background(tag) {
                            let storage = storage.to_string();
                            self.set_background(storage);
                        }
                    }
                    "cm" | "ct" => self.text.clear(),
                    _ => {}
                },
            }
        }
    }

    /// Leave the current wait and run to the next one.
    ///
    /// Returns `false` when the script is already exhausted.
    pub fn advance(&mut self) -> bool {
        if self.is_finished() {
            return false;
        }
        if self.waiting == Some(Wait::Page) {
            self.text.clear();
        }
        self.run();
        true
    }

    pub fn is_finished(&self) -> bool {
        self.cursor >= self.tokens.len()
    }

    pub fn label(&self) -> Option<&Label> {
        self.label.as_ref()
    }

    pub fn render_context(&self) -> RenderContext {
        RenderContext::new(self.text.clone(), self.scene.clone())
    }

    fn set_background(&mut self, storage: String) {
        match self.scene.first_mut() {
            Some(active) => *active = storage,
            None => self.scene.push(storage),
        }
    }
}

fn background(tag: &Tag) -> Option<&str> {
    tag.attr("storage").or_else(|| tag.attr("file"))
}

impl RenderAccessors for Interpreter {
    fn text_line_count(&self) -> usize {
        self.text.len()
    }

    fn text_line(&self, index: usize) -> String {
        self.text.get(index).cloned().unwrap_or_default()
    }

    fn image(&self, index: usize) -> Option<String> {
        self.scene.get(index).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::super::parser::parse_script;
    use super::*;

    const PAGES: &str = "
        *page0|opening
        @bg storage=park.png
        I go outside with Illya.[lr]
        We buy three days' worth of groceries.[pg]
        @bg storage=street.png
        Then let's buy a lot.[lr]
    ";

    fn interpreter() -> Interpreter {
        let mut interpreter = Interpreter::new(parse_script(PAGES).unwrap());
        interpreter.run();
        interpreter
    }

    #[test]
    fn run_stops_at_first_line_wait() {
        let interpreter = interpreter();
        assert_eq!(
            interpreter.render_context(),
            RenderContext::new(
                vec!["I go outside with Illya.".into()],
                vec!["park.png".into()]
            )
        );
        assert_eq!(interpreter.label().map(|l| l.heading.as_str()), Some("opening"));
    }

    #[test]
    fn line_wait_appends_and_page_wait_clears() {
        let mut interpreter = interpreter();

        assert!(interpreter.advance());
        assert_eq!(
            interpreter.render_context().text,
            vec![
                "I go outside with Illya.",
                "We buy three days' worth of groceries."
            ]
        );

        assert!(interpreter.advance());
        assert_eq!(
            interpreter.render_context(),
            RenderContext::new(
                vec!["Then let's buy a lot.".into()],
                vec!["street.png".into()]
            )
        );
        assert!(interpreter.is_finished());
        assert!(!interpreter.advance());
    }

    #[test]
    fn page_wait_keeps_the_background() {
        let script = "@bg storage=a.png\nfirst[pg]\nnext[lr]";
        let mut interpreter = Interpreter::new(parse_script(script).unwrap());
        interpreter.run();
        assert!(interpreter.advance());
        assert_eq!(
            interpreter.render_context(),
            RenderContext::new(vec!["next".into()], vec!["a.png".into()])
        );
    }

    #[test]
    fn accessors_mirror_context() {
        let interpreter = interpreter();
        assert_eq!(interpreter.text_line_count(), 1);
        assert_eq!(interpreter.text_line(0), "I go outside with Illya.");
        assert_eq!(interpreter.text_line(5), "");
        assert_eq!(interpreter.image(0).as_deref(), Some("park.png"));
        assert_eq!(interpreter.image(1), None);
    }

    #[test]
    fn advance_vocabulary() {
        assert!(is_advance("Enter"));
        assert!(is_advance("MouseClick"));
        assert!(!is_advance("x"));
        assert!(!is_advance("Escape"));
    }
}
