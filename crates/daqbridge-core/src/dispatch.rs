//! Generic operations over any [`DaqObject`], resolved through the kind
//! fallback chain.
//!
//! Every call starts at the handler of the object's own kind. A handler
//! that does not recognise the item, class or verb returns `None` and the
//! same call is retried one kind further up:
//!
//! | Kind | Chain |
//! |------|-------|
//! | `Channel` | Channel → FunctionBlock → PropertyObject |
//! | `FunctionBlock` | FunctionBlock → PropertyObject |
//! | anything else | Kind → PropertyObject |
//!
//! `PropertyObject` is terminal and always answers.
//!
//! # Example
//!
//! ```
//! use daqbridge_core::{CommandContext, CommandOutcome, DaqObject, dispatch};
//! use daqbridge_sdk::Instance;
//!
//! let instance = Instance::default();
//! let root = DaqObject::Device(instance.root().clone());
//! let ctx = CommandContext { root: Some(instance.root().clone()) };
//! let mut out = Vec::<String>::new();
//!
//! let outcome = dispatch::process_command(&root, &["add", "device", "daqref://device0"], &ctx, &mut out).unwrap();
//! let CommandOutcome::Selected(device) = outcome else { unreachable!() };
//! assert_eq!(dispatch::get(&device, "name").unwrap(), "Reference device 0");
//! assert_eq!(dispatch::count(&root, "devices").unwrap(), 1);
//! ```

use daqbridge_types::{DaqError, DaqResult, ObjectKind};
use tracing::debug;

use crate::console::Sink;
use crate::handlers::{
    CommandContext, CommandOutcome, Description, Handled, HelpEntry, KindHandler, Listing, handler_for,
};
use crate::object::DaqObject;

/// Run `call` against each handler in the chain of `kind` until one answers.
fn chase<T>(kind: ObjectKind, what: &str, mut call: impl FnMut(&dyn KindHandler) -> Handled<T>) -> DaqResult<T> {
    for link in kind.chain() {
        if let Some(result) = call(handler_for(link)) {
            debug!(kind = %kind, handled_by = %link, what, ok = result.is_ok(), "dispatched");
            return result;
        }
    }
    Err(DaqError::MethodNotImplemented(what.to_string()))
}

/// Structured description of `item`.
///
/// # Errors
///
/// [`DaqError::PropertyDoesntExist`] when no kind in the chain knows `item`.
pub fn describe(obj: &DaqObject, item: &str) -> DaqResult<Description> {
    chase(obj.kind(), item, |h| h.describe(obj, item))
}

/// Write the description of `item` to `sink`.
pub fn print(obj: &DaqObject, item: &str, sink: &mut dyn Sink) -> DaqResult<()> {
    let description = describe(obj, item)?;
    for line in &description.lines {
        sink.line(line);
    }
    Ok(())
}

/// Textual value of `item`.
pub fn get(obj: &DaqObject, item: &str) -> DaqResult<String> {
    describe(obj, item).map(|d| d.value)
}

pub fn listing(obj: &DaqObject, class: &str) -> DaqResult<Listing> {
    chase(obj.kind(), class, |h| h.list(obj, class))
}

/// Write the entries of `class` to `sink`.
pub fn list(obj: &DaqObject, class: &str, sink: &mut dyn Sink) -> DaqResult<()> {
    for line in listing(obj, class)?.lines() {
        sink.line(&line);
    }
    Ok(())
}

/// Assign `value` to `item`. Property values are evaluated from text.
///
/// # Errors
///
/// [`DaqError::PropertyDoesntExist`] for unknown items, a generic failure
/// when the value cannot be evaluated or violates the property's bounds.
pub fn set(obj: &DaqObject, item: &str, value: &str) -> DaqResult<()> {
    chase(obj.kind(), item, |h| h.set(obj, item, value))
}

/// The `index`-th child of `class`.
///
/// # Errors
///
/// [`DaqError::OutOfBounds`] when `index` is past the end of the class.
pub fn select(obj: &DaqObject, class: &str, index: usize) -> DaqResult<DaqObject> {
    chase(obj.kind(), class, |h| h.select(obj, class, index))
}

pub fn count(obj: &DaqObject, class: &str) -> DaqResult<usize> {
    chase(obj.kind(), class, |h| h.count(obj, class))
}

/// Help entries for `kind`, most general kind first.
pub fn help_entries(kind: ObjectKind) -> Vec<(ObjectKind, &'static [HelpEntry])> {
    let mut sections: Vec<_> = kind.chain().into_iter().map(|k| (k, handler_for(k).help())).collect();
    sections.reverse();
    sections
}

/// Write the help of `kind` and all its parents to `sink`.
pub fn help(kind: ObjectKind, sink: &mut dyn Sink) {
    for (section, entries) in help_entries(kind) {
        sink.line(&format!("{section}:"));
        for e in entries {
            sink.line(&format!("  {:<56} {}", e.usage, e.text));
        }
    }
}

fn operand<'a>(verb: &str, tokens: &[&'a str], at: usize) -> DaqResult<&'a str> {
    tokens
        .get(at)
        .copied()
        .ok_or_else(|| DaqError::generic(format!("Missing argument for '{verb}'.")))
}

/// Execute one tokenised command line against `obj`.
///
/// The generic verbs are `print`, `list`, `set`, `get`, `select`,
/// `getCount` and `help`. Any other verb is offered to the kind handlers.
/// `get` and `getCount` also write their result to `sink`. An empty line is
/// [`CommandOutcome::Idle`].
///
/// # Errors
///
/// Whatever the operation fails with; unknown verbs end in
/// [`DaqError::MethodNotImplemented`].
pub fn process_command(
    obj: &DaqObject,
    tokens: &[&str],
    ctx: &CommandContext,
    sink: &mut dyn Sink,
) -> DaqResult<CommandOutcome> {
    let Some((&verb, args)) = tokens.split_first() else {
        return Ok(CommandOutcome::Idle);
    };
    debug!(kind = %obj.kind(), verb, args = args.len(), "processing command");
    match verb {
        "print" => print(obj, operand(verb, args, 0)?, sink).map(|_| CommandOutcome::Done),
        "list" => list(obj, operand(verb, args, 0)?, sink).map(|_| CommandOutcome::Done),
        "set" => {
            let item = operand(verb, args, 0)?;
            operand(verb, args, 1)?;
            set(obj, item, &args[1..].join(" ")).map(|_| CommandOutcome::Done)
        }
        "get" => {
            let value = get(obj, operand(verb, args, 0)?)?;
            sink.line(&value);
            Ok(CommandOutcome::Value(value))
        }
        "select" => {
            let class = operand(verb, args, 0)?;
            let index = match args.get(1) {
                Some(text) => crate::handlers::parse_index(verb, text)?,
                None => 0,
            };
            select(obj, class, index).map(CommandOutcome::Selected)
        }
        "getCount" => {
            let n = count(obj, operand(verb, args, 0)?)?;
            sink.line(&n.to_string());
            Ok(CommandOutcome::Count(n))
        }
        "help" => {
            help(obj.kind(), sink);
            Ok(CommandOutcome::Done)
        }
        _ => chase(obj.kind(), verb, |h| h.command(obj, verb, args, ctx)),
    }
}

/// Split a command line on whitespace. Double quotes group words; the
/// quotes are kept so property values can still be told apart as strings.
pub fn tokenize(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    for c in line.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                current.push(c);
            }
            c if c.is_whitespace() && !quoted => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use daqbridge_sdk::Instance;
    use daqbridge_types::ErrorCode;

    struct Fixture {
        instance: Instance,
        root: DaqObject,
    }

    impl Fixture {
        fn new() -> Self {
            let instance = Instance::default();
            let root = DaqObject::Device(instance.root().clone());
            Self { instance, root }
        }

        fn ctx(&self) -> CommandContext {
            CommandContext {
                root: Some(self.instance.root().clone()),
            }
        }

        fn run(&self, obj: &DaqObject, line: &str) -> DaqResult<CommandOutcome> {
            let tokens = tokenize(line);
            let tokens: Vec<&str> = tokens.iter().map(String::as_str).collect();
            process_command(obj, &tokens, &self.ctx(), &mut Vec::<String>::new())
        }

        fn channel(&self) -> DaqObject {
            let dev = self.instance.root().add_device("daqref://device0").unwrap();
            DaqObject::from_block(dev.channels()[0].clone())
        }
    }

    #[test]
    fn empty_command_is_idle() {
        let f = Fixture::new();
        let outcome = f.run(&f.root, "   ").unwrap();
        assert!(!outcome.executed());
    }

    #[test]
    fn channel_falls_back_to_function_block_and_properties() {
        let f = Fixture::new();
        let ch = f.channel();
        assert_eq!(get(&ch, "tags").unwrap(), "analog, reference");
        assert_eq!(get(&ch, "id").unwrap(), "RefChannel");
        assert_eq!(get(&ch, "Waveform").unwrap(), "Sine");
        set(&ch, "Amplitude", "2.5").unwrap();
        assert_eq!(get(&ch, "Amplitude").unwrap(), "2.5");
    }

    /// Same value, or same code and diagnostic.
    fn assert_same<T: PartialEq + std::fmt::Debug>(via_channel: DaqResult<T>, direct: DaqResult<T>, what: &str) {
        match (via_channel, direct) {
            (Ok(a), Ok(b)) => assert_eq!(a, b, "{what}"),
            (Err(a), Err(b)) => {
                assert_eq!(a.code(), b.code(), "{what}");
                assert_eq!(a.to_string(), b.to_string(), "{what}");
            }
            (a, b) => panic!("{what}: {a:?} vs {b:?}"),
        }
    }

    fn printed(f: &Fixture, obj: &DaqObject, line: &str) -> (Option<ErrorCode>, Vec<String>) {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let mut out = Vec::<String>::new();
        let code = process_command(obj, &tokens, &f.ctx(), &mut out).err().map(|e| e.code());
        (code, out)
    }

    #[test]
    fn channel_fallback_matches_direct_parent_calls() {
        let f = Fixture::new();
        let dev = f.instance.root().add_device("daqref://device0").unwrap();
        let block = dev.channels()[0].clone();
        let channel = DaqObject::Channel(block.clone());
        let as_block = DaqObject::FunctionBlock(block.clone());
        let as_props = DaqObject::PropertyObject(block.properties().clone());

        for item in ["name", "id", "description", "global-id"] {
            assert_same(get(&channel, item), get(&as_block, item), item);
            assert_same(describe(&channel, item), describe(&as_block, item), item);
            assert_eq!(printed(&f, &channel, &format!("print {item}")), printed(&f, &as_block, &format!("print {item}")));
        }
        for item in ["Waveform", "Amplitude", "Bogus"] {
            assert_same(get(&channel, item), get(&as_props, item), item);
            assert_same(get(&channel, item), get(&as_block, item), item);
            assert_eq!(printed(&f, &channel, &format!("get {item}")), printed(&f, &as_props, &format!("get {item}")));
        }
        for class in ["signals", "input-ports", "properties", "bogus"] {
            assert_same(listing(&channel, class), listing(&as_block, class), class);
            assert_eq!(printed(&f, &channel, &format!("list {class}")), printed(&f, &as_block, &format!("list {class}")));
        }
        assert_same(listing(&channel, "properties"), listing(&as_props, "properties"), "properties");

        let (code, out) = printed(&f, &channel, "get Bogus");
        assert_eq!(code, Some(ErrorCode::PropertyDoesntExist));
        assert!(out.is_empty());
        assert_eq!(printed(&f, &channel, "list bogus").0, Some(ErrorCode::PropertyDoesntExist));
    }

    #[test]
    fn unknown_items_fail_at_the_end_of_the_chain() {
        let f = Fixture::new();
        let ch = f.channel();
        assert_eq!(get(&ch, "Bogus").unwrap_err().code(), ErrorCode::PropertyDoesntExist);
        assert_eq!(set(&ch, "Bogus", "1").unwrap_err().code(), ErrorCode::PropertyDoesntExist);
        assert_eq!(count(&ch, "bogus").unwrap_err().code(), ErrorCode::PropertyDoesntExist);
        let err = f.run(&ch, "frobnicate now").unwrap_err();
        assert_eq!(err.code(), ErrorCode::MethodNotImplemented);
    }

    #[test]
    fn set_joins_the_rest_of_the_line() {
        let f = Fixture::new();
        let fb = f.run(&f.root, "add function-block RefFBModuleScaling").unwrap();
        let CommandOutcome::Selected(fb) = fb else {
            panic!("expected a selection");
        };
        f.run(&fb, "set Name \"my scaler\"").unwrap();
        assert_eq!(get(&fb, "Name").unwrap(), "my scaler");
    }

    #[test]
    fn get_and_count_write_to_the_sink() {
        let f = Fixture::new();
        let mut out = Vec::<String>::new();
        let outcome = process_command(&f.root, &["getCount", "available-devices"], &f.ctx(), &mut out).unwrap();
        assert!(matches!(outcome, CommandOutcome::Count(2)));
        assert_eq!(out, vec!["2".to_string()]);
    }

    #[test]
    fn missing_operands_are_generic_failures() {
        let f = Fixture::new();
        assert_eq!(f.run(&f.root, "print").unwrap_err().code(), ErrorCode::Generic);
        assert_eq!(f.run(&f.root, "set Name").unwrap_err().code(), ErrorCode::Generic);
        assert_eq!(f.run(&f.root, "select devices x").unwrap_err().code(), ErrorCode::Generic);
    }

    #[test]
    fn help_is_chained_parent_first() {
        let sections = help_entries(ObjectKind::Channel);
        let kinds: Vec<_> = sections.iter().map(|(k, _)| *k).collect();
        assert_eq!(
            kinds,
            vec![ObjectKind::PropertyObject, ObjectKind::FunctionBlock, ObjectKind::Channel]
        );
        let mut out = String::new();
        help(ObjectKind::Signal, &mut out);
        assert!(out.starts_with("PropertyObject:\n"));
        assert!(out.contains("Signal:\n"));
    }

    #[test]
    fn tokenize_keeps_quoted_words_together() {
        assert_eq!(tokenize("set Name \"a b\""), vec!["set", "Name", "\"a b\""]);
        assert!(tokenize("  ").is_empty());
    }
}
