//! Streaming parser
//!
//! Feeds tokens into an open-node stack over a [`Tree`], applying the kind
//! registry's structural rules as nodes are created. Output goes to a
//! [`Surface`]: partial targets are replaced as soon as their subtree
//! closes, everything else once at [`Parser::finish`].

use std::collections::HashMap;
use std::sync::Arc;

use tkml_dom::{IdGenerator, KindRegistry, Node, NodeId, Tree, ROOT_TAG};
use tkml_render::{Attachment, Effect, HostTarget, Render, RenderContext, Surface};

use crate::envelope::{sniff, Envelope, Sniff};
use crate::error::ParseError;
use crate::tokenizer::{Token, Tokenizer};
use crate::utf8::Utf8Decoder;

/// Where the parsed result goes.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ParseTarget {
    /// Replace the whole page root
    #[default]
    Root,
    /// Replace each listed element as soon as its subtree is complete
    Partial(Vec<String>),
    /// Replace the attachment's element with the parsed children
    Attach(Attachment),
}

impl ParseTarget {
    /// Partial target from a comma-separated identity list.
    pub fn partial(ids: &str) -> Self {
        ParseTarget::Partial(
            ids.split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(String::from)
                .collect(),
        )
    }

    pub fn is_root(&self) -> bool {
        matches!(self, ParseTarget::Root)
    }
}

#[derive(Debug)]
pub struct ParseOutput {
    /// Everything written to the surface by this parse
    pub markup: String,
    /// Effects requested while rendering
    pub effects: Vec<Effect>,
    pub tree: Tree,
}

#[derive(Debug, Clone, PartialEq)]
enum State {
    Sniffing,
    Parsing,
    Failed(ParseError),
}

struct RawRegion {
    node: NodeId,
    depth: usize,
    content: String,
}

pub struct Parser<S: Surface + ?Sized> {
    surface: Arc<S>,
    registry: Arc<KindRegistry>,
    renderer: Arc<dyn Render>,
    target: ParseTarget,
    envelope: Envelope,
    state: State,
    utf8: Utf8Decoder,
    tokenizer: Tokenizer,
    sniffed: String,
    tree: Tree,
    stack: Vec<NodeId>,
    raw: Option<RawRegion>,
    markup: String,
    effects: Vec<Effect>,
}

impl<S: Surface + ?Sized> Parser<S> {
    pub fn new(
        surface: Arc<S>,
        registry: Arc<KindRegistry>,
        renderer: Arc<dyn Render>,
        ids: Arc<IdGenerator>,
        target: ParseTarget,
    ) -> Self {
        let tree = Tree::new(registry.root(), ids);
        Self {
            surface,
            registry,
            renderer,
            target,
            envelope: Envelope::Detect,
            state: State::Sniffing,
            utf8: Utf8Decoder::new(),
            tokenizer: Tokenizer::new(),
            sniffed: String::new(),
            tree,
            stack: Vec::new(),
            raw: None,
            markup: String::new(),
            effects: Vec::new(),
        }
    }

    pub fn with_envelope(mut self, envelope: Envelope) -> Self {
        self.envelope = envelope;
        self
    }

    pub fn target(&self) -> &ParseTarget {
        &self.target
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.state, State::Failed(_))
    }

    /// Feed the next piece of decoded text.
    pub fn add(&mut self, text: &str) {
        match self.state {
            State::Failed(_) => {}
            State::Parsing => self.feed(text, false),
            State::Sniffing => {
                self.sniffed.push_str(text);
                let decision = self.decide(false);
                if decision != Sniff::Undecided {
                    self.begin(decision == Sniff::Present);
                    let pending = std::mem::take(&mut self.sniffed);
                    self.feed(&pending, false);
                }
            }
        }
    }

    /// Feed raw bytes; multi-byte characters may be split across calls.
    pub fn add_bytes(&mut self, bytes: &[u8]) {
        let text = self.utf8.decode(bytes);
        if !text.is_empty() {
            self.add(&text);
        }
    }

    /// Drain the input, then render to the surface according to the target.
    pub fn finish(mut self) -> Result<ParseOutput, ParseError> {
        let tail = self.utf8.finish();
        if !tail.is_empty() {
            self.add(&tail);
        }

        match self.state {
            State::Failed(ref err) => return Err(err.clone()),
            State::Sniffing => {
                let decision = self.decide(true);
                self.begin(decision == Sniff::Present);
                let pending = std::mem::take(&mut self.sniffed);
                self.feed(&pending, true);
            }
            State::Parsing => self.pump(true),
        }
        if let State::Failed(err) = &self.state {
            return Err(err.clone());
        }

        if let Some(region) = self.raw.take() {
            tracing::debug!(node = region.node.index(), "Raw region left open at end of input");
            self.tree.set_raw(region.node, region.content);
        }
        self.stack.clear();

        let root = self.tree.root();
        let runtime_id = self.tree.ids().runtime_id();
        let target = std::mem::take(&mut self.target);

        let markup = match target {
            ParseTarget::Partial(_) => std::mem::take(&mut self.markup),
            ParseTarget::Attach(attachment) => {
                let (host, host_target) = match &attachment.parent {
                    Some(parent) => {
                        let host = self.tree.adopt_children(root, parent);
                        let host_target =
                            self.renderer
                                .wrapping_host(&self.tree, host, &attachment.identity);
                        (host, host_target)
                    }
                    None => (root, HostTarget::Element(attachment.identity.clone())),
                };

                let mut cx = RenderContext::new(&self.tree, runtime_id);
                let html = if host == root {
                    self.renderer.render(&mut cx, root)
                } else {
                    let children = self.tree.children(host).to_vec();
                    self.renderer.render_children(&mut cx, host, &children)
                };
                self.effects.extend(cx.into_effects());
                self.surface.replace_element(&host_target, &html);
                html
            }
            ParseTarget::Root => {
                let mut cx = RenderContext::new(&self.tree, runtime_id);
                let html = self.renderer.render(&mut cx, root);
                self.effects.extend(cx.into_effects());
                self.surface.replace_root(&html);
                html
            }
        };

        tracing::trace!(nodes = self.tree.len(), "Parse finished");
        Ok(ParseOutput {
            markup,
            effects: self.effects,
            tree: self.tree,
        })
    }

    fn decide(&self, eof: bool) -> Sniff {
        match self.envelope {
            Envelope::Detect => sniff(&self.sniffed, eof),
            Envelope::Synthesize => Sniff::Absent,
            Envelope::Present => Sniff::Present,
        }
    }

    fn begin(&mut self, envelope_present: bool) {
        self.state = State::Parsing;
        if !envelope_present {
            self.stack.push(self.tree.root());
        }
    }

    fn feed(&mut self, text: &str, eof: bool) {
        self.tokenizer.push(text);
        self.pump(eof);
    }

    fn pump(&mut self, eof: bool) {
        loop {
            match self.tokenizer.next_token(eof) {
                Ok(Some(token)) => self.handle(token),
                Ok(None) => break,
                Err(err) => {
                    self.fail(err);
                    break;
                }
            }
        }
    }

    fn fail(&mut self, err: ParseError) {
        tracing::debug!(error = %err, "Tokenizer error");
        self.surface.failed(&err);
        self.state = State::Failed(err);
    }

    fn current(&self) -> NodeId {
        self.stack.last().copied().unwrap_or_else(|| self.tree.root())
    }

    fn handle(&mut self, token: Token) {
        match token {
            Token::Open {
                name,
                attributes,
                self_closing,
            } => self.open(name, attributes, self_closing),
            Token::Close { name } => {
                if self
                    .registry
                    .lookup(&name)
                    .is_some_and(|spec| spec.is_self_closing())
                {
                    tracing::trace!(tag = %name, "Ignoring close of self-closing kind");
                    return;
                }
                if let Some(id) = self.stack.pop() {
                    self.closed(id);
                }
            }
            Token::Text(text) => {
                if self.stack.is_empty() {
                    tracing::trace!("Dropping text outside the document");
                    return;
                }
                let parent = self.current();
                self.tree.append_text(parent, &text);
            }
            Token::RawText(text) => {
                if let Some(region) = &mut self.raw {
                    region.content.push_str(&text);
                }
            }
            Token::RawOpen {
                verbatim,
                self_closing,
            } => {
                if let Some(region) = &mut self.raw {
                    region.content.push_str(&verbatim);
                    if !self_closing {
                        region.depth += 1;
                    }
                }
            }
            Token::RawClose { verbatim } => {
                let Some(region) = &mut self.raw else {
                    return;
                };
                if region.depth > 0 {
                    region.depth -= 1;
                    region.content.push_str(&verbatim);
                    return;
                }
                if let Some(region) = self.raw.take() {
                    self.tree.set_raw(region.node, region.content);
                    self.tokenizer.exit_raw();
                    self.stack.pop();
                    self.closed(region.node);
                }
            }
        }
    }

    fn open(&mut self, name: String, attributes: HashMap<String, String>, self_closing: bool) {
        if self.stack.is_empty() && name == ROOT_TAG {
            self.tree.set_root_attributes(attributes);
            self.stack.push(self.tree.root());
            return;
        }

        let parent = self.current();
        let parent_tag = self.tree.get(parent).tag().to_string();

        let mut raw = false;
        let (node, closes) = match self.registry.lookup(&name).cloned() {
            Some(spec) => {
                let closes = self_closing || spec.is_self_closing();
                if spec.allows_parent(&parent_tag) {
                    raw = spec.allows_raw_text() && !closes;
                    (Node::element(spec, decode_src(attributes)), closes)
                } else {
                    tracing::debug!(tag = %name, parent = %parent_tag, "Rejected by parent constraint");
                    let message = format!(
                        "Component <{}> cannot be a child of <{}>",
                        name, parent_tag
                    );
                    (Node::error(message), closes)
                }
            }
            None => {
                tracing::debug!(tag = %name, "Undefined component");
                (Node::undefined(&name, attributes), self_closing)
            }
        };

        let id = self.tree.append(parent, node);
        if closes {
            self.closed(id);
            return;
        }

        self.stack.push(id);
        if raw {
            self.tokenizer.enter_raw(&name);
            self.raw = Some(RawRegion {
                node: id,
                depth: 0,
                content: String::new(),
            });
        }
    }

    /// A node's subtree is complete.
    fn closed(&mut self, id: NodeId) {
        let ParseTarget::Partial(targets) = &self.target else {
            return;
        };
        let Some(identity) = self.tree.get(id).explicit_identity() else {
            return;
        };
        if !targets.iter().any(|t| t == identity) {
            return;
        }

        let identity = identity.to_string();
        let mut cx = RenderContext::new(&self.tree, self.tree.ids().runtime_id());
        let html = self.renderer.render(&mut cx, id);
        self.effects.extend(cx.into_effects());

        tracing::debug!(identity = %identity, "Partial target complete");
        self.surface
            .replace_element(&HostTarget::Element(identity), &html);
        self.markup.push_str(&html);
    }
}

/// `src` values arrive percent-encoded and are stored decoded.
fn decode_src(mut attributes: HashMap<String, String>) -> HashMap<String, String> {
    if let Some(src) = attributes.get_mut("src") {
        *src = percent::decode(src);
    }
    attributes
}

mod percent {
    pub fn decode(input: &str) -> String {
        let bytes = input.as_bytes();
        let mut out = Vec::with_capacity(bytes.len());
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] == b'%' && i + 2 < bytes.len() {
                let hex = std::str::from_utf8(&bytes[i + 1..i + 3])
                    .ok()
                    .and_then(|h| u8::from_str_radix(h, 16).ok());
                if let Some(byte) = hex {
                    out.push(byte);
                    i += 3;
                    continue;
                }
            }
            out.push(bytes[i]);
            i += 1;
        }
        String::from_utf8_lossy(&out).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use tkml_dom::{DetachedNode, NodeKind};
    use tkml_render::HtmlRenderer;

    #[derive(Default)]
    struct Recorder {
        ops: Mutex<Vec<String>>,
    }

    impl Surface for Recorder {
        fn replace_element(&self, target: &HostTarget, markup: &str) {
            self.ops.lock().push(format!("element {:?} {}", target, markup));
        }

        fn replace_root(&self, markup: &str) {
            self.ops.lock().push(format!("root {}", markup));
        }

        fn failed(&self, error: &(dyn std::error::Error + 'static)) {
            self.ops.lock().push(format!("failed {}", error));
        }
    }

    fn new_parser(target: ParseTarget) -> (Arc<Recorder>, Parser<Recorder>) {
        let surface = Arc::new(Recorder::default());
        let parser = Parser::new(
            surface.clone(),
            Arc::new(KindRegistry::builtin()),
            Arc::new(HtmlRenderer::new()),
            Arc::new(IdGenerator::new(1)),
            target,
        );
        (surface, parser)
    }

    fn parse(input: &str) -> ParseOutput {
        let (_, mut parser) = new_parser(ParseTarget::Root);
        parser.add(input);
        parser.finish().unwrap()
    }

    fn parse_chunks(chunks: &[&str]) -> (String, String) {
        let (_, mut parser) = new_parser(ParseTarget::Root);
        for chunk in chunks {
            parser.add(chunk);
        }
        let output = parser.finish().unwrap();
        (output.tree.outline(output.tree.root()), output.markup)
    }

    const DOCUMENTS: &[&str] = &[
        "<p>hi<b>bold</b></p>",
        "<!-- lead -->\n<tkml id=\"page\"><title>T &amp; U</title><list id=\"l\"><section href=\"a.page\" preload>One</section><loader href=\"more\"/></list><code lang=\"rs\">let x = \"<code>\";</code> done</code></tkml>",
        "hello <p>a<b>b</b>&#65;</p><back>x</back><br/><card k='v'>y</card>",
        "  <!--x--> <p>x &lt; y<br>z</br></p><header><menu href=\"/m\"><back/></header>",
        "<info><pill>a</pill><pill>b</pill>\n<p>c</p></info><img src=\"a%20b.png\"/>",
    ];

    #[test]
    fn test_fragment_is_wrapped() {
        let output = parse("<p>hi<b>bold</b></p>");
        let tree = &output.tree;
        assert_eq!(tree.outline(tree.root()), r#"tkml(p("hi" b("bold")))"#);
        assert!(tree.diagnostics(tree.root()).is_empty());
        assert_eq!(output.markup, "<p>hi<b>bold</b></p>");
    }

    #[test]
    fn test_parent_constraint_yields_error_node() {
        let output = parse("<back>x</back>");
        let tree = &output.tree;
        let diagnostics = tree.diagnostics(tree.root());
        assert_eq!(diagnostics.len(), 1);
        match tree.get(diagnostics[0]).kind() {
            NodeKind::Error { message } => {
                assert!(message.contains("cannot be a child of <tkml>"));
            }
            other => panic!("expected error node, got {:?}", other),
        }
        assert!(output.markup.contains(r#"<div class="panic">"#));
    }

    #[test]
    fn test_allowed_parent_accepted() {
        let output = parse("<header><back/></header>");
        let tree = &output.tree;
        assert_eq!(tree.outline(tree.root()), "tkml(header(back))");
    }

    #[test]
    fn test_undefined_component() {
        let output = parse("<card>x</card>");
        let tree = &output.tree;
        assert_eq!(tree.outline(tree.root()), r#"tkml(undefined[card]("x"))"#);
        assert!(output.markup.contains("Undefined component: card"));
    }

    #[test]
    fn test_raw_region_nested_same_kind() {
        let output = parse("<code>a <code>b</code> <p>c</p></code><p>after</p>");
        let tree = &output.tree;
        assert_eq!(
            tree.outline(tree.root()),
            r#"tkml(code("a <code>b</code> <p>c</p>") p("after"))"#
        );
    }

    #[test]
    fn test_raw_region_is_byte_identical() {
        let source = "  x &amp; <b>y</b>\n\t<CODE>z</CODE >";
        let output = parse(&format!("<code>{}</code>", source));
        let tree = &output.tree;
        let code = tree.children(tree.root())[0];
        assert_eq!(tree.get(code).raw_text(), Some(source));
    }

    #[test]
    fn test_self_closing_kinds() {
        let output = parse("<p>a<br>b</br>c</p>");
        let tree = &output.tree;
        assert_eq!(tree.outline(tree.root()), r#"tkml(p("a" br "bc"))"#);
    }

    #[test]
    fn test_explicit_envelope() {
        let output = parse("<!-- c --><tkml id=\"page\"><p>a</p></tkml>");
        let tree = &output.tree;
        assert_eq!(tree.identity(tree.root()), "page");
        assert_eq!(tree.outline(tree.root()), r#"tkml(p("a"))"#);
    }

    #[test]
    fn test_envelope_flag_overrides_sniffing() {
        let (_, parser) = new_parser(ParseTarget::Root);
        let mut parser = parser.with_envelope(Envelope::Synthesize);
        parser.add("<tkml><p>a</p></tkml>");
        let output = parser.finish().unwrap();
        let tree = &output.tree;
        assert_eq!(tree.outline(tree.root()), r#"tkml(tkml(p("a")))"#);

        let (_, parser) = new_parser(ParseTarget::Root);
        let mut parser = parser.with_envelope(Envelope::Present);
        parser.add("<tkml><p>a</p></tkml>");
        let output = parser.finish().unwrap();
        assert_eq!(output.tree.outline(output.tree.root()), r#"tkml(p("a"))"#);
    }

    #[test]
    fn test_src_is_percent_decoded() {
        let output = parse("<img src=\"a%20b.png\"/>");
        let tree = &output.tree;
        let img = tree.children(tree.root())[0];
        assert_eq!(tree.get(img).attr("src"), Some("a b.png"));
    }

    #[test]
    fn test_chunk_boundary_independence() {
        for document in DOCUMENTS {
            let whole = parse_chunks(&[document]);
            for split in 1..document.len() {
                if !document.is_char_boundary(split) {
                    continue;
                }
                let (a, b) = document.split_at(split);
                assert_eq!(parse_chunks(&[a, b]), whole, "split at {} of {:?}", split, document);
            }
            for size in 1..8 {
                let chunks: Vec<&str> = document
                    .as_bytes()
                    .chunks(size)
                    .map(|c| std::str::from_utf8(c).unwrap())
                    .collect();
                assert_eq!(parse_chunks(&chunks), whole, "chunk size {}", size);
            }
        }
    }

    #[test]
    fn test_byte_chunks_split_multibyte() {
        let document = "<p>héllo ✓</p>";
        let (_, mut whole) = new_parser(ParseTarget::Root);
        whole.add(document);
        let whole = whole.finish().unwrap();

        for size in 1..5 {
            let (_, mut chunked) = new_parser(ParseTarget::Root);
            for chunk in document.as_bytes().chunks(size) {
                chunked.add_bytes(chunk);
            }
            let chunked = chunked.finish().unwrap();
            assert_eq!(chunked.markup, whole.markup);
        }
    }

    #[test]
    fn test_partial_targets_stream_on_close() {
        let (surface, mut parser) = new_parser(ParseTarget::partial("feed, side"));
        parser.add("<list id=\"feed\"><section>a</section></list>");
        assert_eq!(surface.ops.lock().len(), 1);
        assert!(surface.ops.lock()[0].starts_with("element Element(\"feed\") <div class=\"list\""));

        parser.add("<info id=\"side\">x</info><p>ignored</p>");
        let output = parser.finish().unwrap();

        let ops = surface.ops.lock();
        assert_eq!(ops.len(), 2);
        assert!(ops[1].starts_with("element Element(\"side\")"));
        assert!(!ops.iter().any(|op| op.starts_with("root")));
        assert!(output.markup.contains("list-section"));
        assert!(!output.markup.contains("ignored"));
    }

    #[test]
    fn test_attachment_reparents_children() {
        let registry = KindRegistry::builtin();
        let attachment = Attachment {
            identity: "loader-1-7".to_string(),
            parent: Some(DetachedNode {
                kind: NodeKind::Element(registry.lookup("list").unwrap().clone()),
                attributes: HashMap::new(),
                identity: "feed".to_string(),
            }),
        };
        let (surface, mut parser) = new_parser(ParseTarget::Attach(attachment));
        parser.add("<section>a</section>\n<section>b</section>");
        let output = parser.finish().unwrap();

        let tree = &output.tree;
        assert!(tree.children(tree.root()).is_empty());
        assert_eq!(tree.descendants(tree.root()).len(), 1);

        assert_eq!(
            output.markup,
            "<div class=\"list-item list-section\"><div class=\"section\"><div class=\"section-content\">a</div></div></div>\
             <div class=\"list-item list-section\"><div class=\"section\"><div class=\"section-content\">b</div></div></div>"
        );
        let ops = surface.ops.lock();
        assert_eq!(ops.len(), 1);
        assert!(ops[0].starts_with("element ParentOf(\"loader-1-7\")"));
    }

    #[test]
    fn test_attachment_without_parent() {
        let attachment = Attachment {
            identity: "slot".to_string(),
            parent: None,
        };
        let (surface, mut parser) = new_parser(ParseTarget::Attach(attachment));
        parser.add("<p>x</p>");
        parser.finish().unwrap();
        assert_eq!(
            surface.ops.lock().as_slice(),
            &["element Element(\"slot\") <p>x</p>".to_string()]
        );
    }

    #[test]
    fn test_tokenizer_error_reports_failure() {
        let (surface, mut parser) = new_parser(ParseTarget::Root);
        parser.add("<p>ok</p><p =x>");
        assert!(parser.is_failed());
        parser.add("<p>more</p>");
        let err = parser.finish().unwrap_err();
        assert!(matches!(err, ParseError::MalformedTag { .. }));

        let ops = surface.ops.lock();
        assert_eq!(ops.len(), 1);
        assert!(ops[0].starts_with("failed Malformed tag"));
    }

    #[test]
    fn test_unterminated_tag_fails_at_finish() {
        let (surface, mut parser) = new_parser(ParseTarget::Root);
        parser.add("<p>ok</p><p class=\"x");
        assert!(!parser.is_failed());
        assert!(parser.finish().is_err());
        assert!(surface.ops.lock()[0].starts_with("failed Unterminated tag"));
    }

    #[test]
    fn test_render_effects_collected() {
        let output = parse("<list><loader href=\"more.page\"/></list><a href=\"x\" preload>x</a>");
        assert_eq!(output.effects.len(), 2);
        assert!(matches!(output.effects[0], Effect::LazyLoad { .. }));
        assert_eq!(output.effects[1], Effect::Preload("x".to_string()));
    }

    #[test]
    fn test_percent_decode() {
        assert_eq!(percent::decode("a%20b"), "a b");
        assert_eq!(percent::decode("100%"), "100%");
        assert_eq!(percent::decode("%zz%41"), "%zzA");
        assert_eq!(percent::decode("%C3%A9"), "é");
    }
}
