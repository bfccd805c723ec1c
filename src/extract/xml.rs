//! Owned XML tree and a restricted XPath evaluator
//!
//! The supported query subset: absolute `/a/b`, relative `./a` (or bare
//! `a`), descendant `//a`, a final `@attr` step, and per-step `[N]`
//! (1-based) or `[@attr="v"]` filters. Element matches yield their
//! immediate text content; attribute matches yield the attribute value.

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::common::{Error, Result};

/// One XML element: name, attributes, children, and its direct text
#[derive(Debug, Clone, Default)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlElement>,
    pub text: String,
}

impl XmlElement {
    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// A parsed XML document
///
/// The root element is held as the single child of a nameless pseudo
/// element, so absolute and descendant steps evaluate uniformly.
#[derive(Debug, Clone)]
pub struct XmlDocument {
    document: XmlElement,
}

impl XmlDocument {
    pub fn parse(source: &str) -> Result<Self> {
        let mut reader = Reader::from_str(source);
        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(element)) => {
                    stack.push(element_of(&element)?);
                }
                Ok(Event::Empty(element)) => {
                    let node = element_of(&element)?;
                    attach(node, &mut stack, &mut root)?;
                }
                Ok(Event::Text(text)) => {
                    if let Some(current) = stack.last_mut() {
                        let decoded = text
                            .unescape()
                            .map_err(|e| Error::Analysis(format!("malformed XML text: {}", e)))?;
                        current.text.push_str(&decoded);
                    }
                }
                Ok(Event::CData(data)) => {
                    if let Some(current) = stack.last_mut() {
                        current
                            .text
                            .push_str(&String::from_utf8_lossy(data.as_ref()));
                    }
                }
                Ok(Event::End(_)) => {
                    let node = stack
                        .pop()
                        .ok_or_else(|| Error::Analysis("unbalanced XML document".into()))?;
                    attach(node, &mut stack, &mut root)?;
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => return Err(Error::Analysis(format!("malformed XML: {}", e))),
            }
            buf.clear();
        }

        if !stack.is_empty() {
            return Err(Error::Analysis("unbalanced XML document".into()));
        }
        let root = root.ok_or_else(|| Error::Analysis("empty XML document".into()))?;
        Ok(Self {
            document: XmlElement {
                children: vec![root],
                ..XmlElement::default()
            },
        })
    }

    /// Evaluate a query against the document, yielding the matched element
    /// texts or attribute values in document order
    pub fn select(&self, query: &str) -> Result<Vec<String>> {
        let parsed = parse_query(query)?;
        let root = &self.document.children[0];

        let mut current: Vec<&XmlElement> = match parsed.start {
            Start::Document => vec![&self.document],
            Start::Root => vec![root],
        };
        for step in &parsed.steps {
            current = apply_step(&current, step);
        }

        let values = match parsed.attribute {
            Some(attr) => current
                .iter()
                .filter_map(|element| element.attribute(&attr))
                .map(str::to_string)
                .collect(),
            None => current
                .iter()
                .map(|element| element.text.trim().to_string())
                .collect(),
        };
        Ok(values)
    }
}

fn element_of(element: &quick_xml::events::BytesStart<'_>) -> Result<XmlElement> {
    let mut node = XmlElement {
        name: String::from_utf8_lossy(element.name().as_ref()).into_owned(),
        ..XmlElement::default()
    };
    for attr in element.attributes() {
        let attr = attr.map_err(|e| Error::Analysis(format!("malformed XML attribute: {}", e)))?;
        node.attributes.push((
            String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
            String::from_utf8_lossy(&attr.value).into_owned(),
        ));
    }
    Ok(node)
}

fn attach(
    node: XmlElement,
    stack: &mut Vec<XmlElement>,
    root: &mut Option<XmlElement>,
) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => {
            if root.is_some() {
                return Err(Error::Analysis("multiple XML root elements".into()));
            }
            *root = Some(node);
        }
    }
    Ok(())
}

#[derive(Debug)]
enum Start {
    /// Absolute and descendant queries evaluate from above the root
    Document,
    /// Relative queries evaluate from the root element
    Root,
}

#[derive(Debug)]
enum Axis {
    Child,
    Descendant,
}

#[derive(Debug)]
enum Filter {
    /// 1-based position among the step's matches under one parent
    Index(usize),
    /// Attribute equality, `[@name="value"]`
    Attribute(String, String),
}

#[derive(Debug)]
struct Step {
    axis: Axis,
    name: String,
    filter: Option<Filter>,
}

#[derive(Debug)]
struct Query {
    start: Start,
    steps: Vec<Step>,
    attribute: Option<String>,
}

fn parse_query(query: &str) -> Result<Query> {
    let text = query.trim();
    if text.is_empty() {
        return Err(invalid_query(query));
    }

    let (start, body) = if let Some(rest) = text.strip_prefix("./") {
        (Start::Root, rest)
    } else if text == "." {
        (Start::Root, "")
    } else if let Some(rest) = text.strip_prefix('/') {
        (Start::Document, rest)
    } else {
        (Start::Root, text)
    };

    let mut steps = Vec::new();
    let mut attribute = None;
    // An empty segment comes from "//" and switches the next step to the
    // descendant axis.
    let mut axis = match start {
        Start::Document if text.starts_with("//") => Axis::Descendant,
        _ => Axis::Child,
    };

    if !body.is_empty() {
        let mut segments = body.split('/').peekable();
        while let Some(segment) = segments.next() {
            if segment.is_empty() {
                axis = Axis::Descendant;
                continue;
            }
            if let Some(attr) = segment.strip_prefix('@') {
                if attr.is_empty() || segments.peek().is_some() {
                    return Err(invalid_query(query));
                }
                attribute = Some(attr.to_string());
                continue;
            }
            steps.push(parse_step(segment, axis, query)?);
            axis = Axis::Child;
        }
    }

    Ok(Query {
        start,
        steps,
        attribute,
    })
}

fn parse_step(segment: &str, axis: Axis, query: &str) -> Result<Step> {
    let (name, filter) = match segment.find('[') {
        Some(open) => {
            if !segment.ends_with(']') {
                return Err(invalid_query(query));
            }
            let name = &segment[..open];
            let filter_text = segment[open + 1..segment.len() - 1].trim();
            let filter = if let Some(condition) = filter_text.strip_prefix('@') {
                let (attr, value) = condition
                    .split_once('=')
                    .ok_or_else(|| invalid_query(query))?;
                let value = value.trim();
                let unquoted = value
                    .strip_prefix('"')
                    .and_then(|v| v.strip_suffix('"'))
                    .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
                    .ok_or_else(|| invalid_query(query))?;
                Filter::Attribute(attr.trim().to_string(), unquoted.to_string())
            } else {
                let index: usize = filter_text
                    .parse()
                    .map_err(|_| invalid_query(query))?;
                if index == 0 {
                    return Err(invalid_query(query));
                }
                Filter::Index(index)
            };
            (name, Some(filter))
        }
        None => (segment, None),
    };

    if name.is_empty() || name.contains('@') {
        return Err(invalid_query(query));
    }
    Ok(Step {
        axis,
        name: name.to_string(),
        filter,
    })
}

fn apply_step<'a>(current: &[&'a XmlElement], step: &Step) -> Vec<&'a XmlElement> {
    let mut matched = Vec::new();
    for node in current {
        let mut found: Vec<&XmlElement> = Vec::new();
        match step.axis {
            Axis::Child => {
                found.extend(node.children.iter().filter(|child| child.name == step.name));
            }
            Axis::Descendant => collect_descendants(node, &step.name, &mut found),
        }
        match &step.filter {
            Some(Filter::Index(position)) => {
                matched.extend(found.into_iter().nth(position - 1));
            }
            Some(Filter::Attribute(name, value)) => {
                matched.extend(
                    found
                        .into_iter()
                        .filter(|element| element.attribute(name) == Some(value.as_str())),
                );
            }
            None => matched.extend(found),
        }
    }
    matched
}

fn collect_descendants<'a>(node: &'a XmlElement, name: &str, out: &mut Vec<&'a XmlElement>) {
    if node.name == name {
        out.push(node);
    }
    for child in &node.children {
        collect_descendants(child, name, out);
    }
}

fn invalid_query(query: &str) -> Error {
    Error::Extraction(format!("invalid XPath query: {}", query))
}
