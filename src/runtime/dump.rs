//! Structural debug rendering in the runtime's `var_dump` layout.

use std::rc::Rc;

use smallvec::SmallVec;

use super::config::DumpConfig;
use super::models::value::format_float;
use super::models::{Key, Value};

/// Render `value` with the default depth limit
pub fn dump(value: &Value) -> String {
    dump_with(value, &DumpConfig::default())
}

/// Render `value`; containers nested deeper than `config.max_depth`
/// print as `...`, and a container reached again on its own path prints
/// as `*RECURSION*`.
pub fn dump_with(value: &Value, config: &DumpConfig) -> String {
    let mut dumper = Dumper {
        out: String::new(),
        path: SmallVec::new(),
        max_depth: config.max_depth,
    };
    dumper.value(value, 0);
    dumper.out
}

struct Dumper {
    out: String,
    /// Buffers on the current path
    path: SmallVec<[usize; 8]>,
    max_depth: usize,
}

impl Dumper {
    fn line(&mut self, depth: usize, text: &str) {
        for _ in 0..depth {
            self.out.push_str("  ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn value(&mut self, value: &Value, depth: usize) {
        match value {
            Value::Null | Value::Unset => self.line(depth, "NULL"),
            Value::Bool(b) => self.line(depth, &format!("bool({})", b)),
            Value::Int(n) => self.line(depth, &format!("int({})", n)),
            Value::Float(f) => self.line(depth, &format!("float({})", format_float(*f))),
            Value::Str(s) => self.line(depth, &format!("string({}) \"{}\"", s.len(), s)),
            Value::Ref(cell) => {
                if cell.with(|inner| self.value(inner, depth)).is_err() {
                    self.line(depth, "*RECURSION*");
                }
            }
            Value::Array(buf) => {
                let addr = Rc::as_ptr(buf) as usize;
                if self.path.contains(&addr) {
                    self.line(depth, "*RECURSION*");
                    return;
                }
                if depth >= self.max_depth {
                    self.line(depth, &format!("array({}) {{...}}", buf.count()));
                    return;
                }
                self.line(depth, &format!("array({}) {{", buf.count()));
                self.path.push(addr);
                for (key, entry) in buf.iter() {
                    let label = match key {
                        Key::Int(n) => format!("[{}]=>", n),
                        Key::Str(s) => format!("[\"{}\"]=>", s),
                    };
                    self.line(depth + 1, &label);
                    self.value(entry, depth + 1);
                }
                self.path.pop();
                self.line(depth, "}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::buffer::ArrayBuffer;
    use crate::runtime::handle::Handle;

    #[test]
    fn test_dump_scalars() {
        assert_eq!(dump(&Value::Null), "NULL\n");
        assert_eq!(dump(&Value::Bool(true)), "bool(true)\n");
        assert_eq!(dump(&Value::Int(-3)), "int(-3)\n");
        assert_eq!(dump(&Value::Float(1.5)), "float(1.5)\n");
        assert_eq!(dump(&Value::Float(10.0)), "float(10)\n");
        assert_eq!(dump(&Value::from("xyz")), "string(3) \"xyz\"\n");
    }

    #[test]
    fn test_dump_nested_array() {
        let inner = Value::list([Value::Int(1)]);
        let value = Value::from(ArrayBuffer::from_pairs([
            ("one", Value::Int(1)),
            ("nested", inner),
        ]));
        let expected = "\
array(2) {
  [\"one\"]=>
  int(1)
  [\"nested\"]=>
  array(1) {
    [0]=>
    int(1)
  }
}
";
        assert_eq!(dump(&value), expected);
    }

    #[test]
    fn test_dump_self_reference_terminates() {
        let h = Handle::array();
        h.set_ref("self", &h).unwrap();
        let expected = "\
array(1) {
  [\"self\"]=>
  *RECURSION*
}
";
        assert_eq!(dump(&h.value()), expected);
    }

    #[test]
    fn test_dump_respects_max_depth() {
        let value = Value::list([Value::list([Value::Int(1)])]);
        let text = dump_with(&value, &DumpConfig { max_depth: 1 });
        assert_eq!(text, "array(1) {\n  [0]=>\n  array(1) {...}\n}\n");
    }

    #[test]
    fn test_dump_multibyte_string_length_in_bytes() {
        assert_eq!(dump(&Value::from("é")), "string(2) \"é\"\n");
    }
}
