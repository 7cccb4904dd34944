use std::io::{Read, Write};

use submerge_base::{CoreError, ErrorKind};
use submerge_lang::Revision;

use crate::conn::{Cancellation, Connection};
use crate::item::Item;

fn malformed(msg: impl Into<String>) -> CoreError {
    CoreError::new(ErrorKind::MalformedData, msg.into())
}

/// Builds one tuple (a fixed-shape list) a field at a time, mirroring the
/// `n r s c w l ( ) [ ]` format language (§4.1) as a typed builder instead
/// of a runtime format string.
#[derive(Default)]
pub struct TupleWriter {
    items: Vec<Item>,
}

impl TupleWriter {
    pub fn new() -> Self {
        TupleWriter { items: Vec::new() }
    }

    pub fn n(mut self, v: u64) -> Self {
        self.items.push(Item::Number(v));
        self
    }

    /// Writes a revision unconditionally as its underlying number; use
    /// [`TupleWriter::optional`] with [`OptionalTupleWriter::r`] to get the
    /// omit-on-sentinel behaviour of an optional `r` slot.
    pub fn r(mut self, v: Revision) -> Self {
        match v.to_wire() {
            Some(n) => self.items.push(Item::Number(n)),
            None => panic!("writing an in-transaction revision outside an optional block"),
        }
        self
    }

    pub fn s(mut self, v: &[u8]) -> Self {
        self.items.push(Item::String(v.to_vec()));
        self
    }

    /// A NUL-free string (the `c` format char). The caller is responsible
    /// for the NUL-free contract; this does not re-validate it.
    pub fn c(mut self, v: &str) -> Self {
        self.items.push(Item::String(v.as_bytes().to_vec()));
        self
    }

    pub fn w(mut self, v: &str) -> Self {
        self.items.push(Item::Word(v.to_string()));
        self
    }

    pub fn l(mut self, v: Item) -> Self {
        self.items.push(v);
        self
    }

    /// A required nested `(` ... `)` list built by a sub-writer.
    pub fn list(mut self, build: impl FnOnce(TupleWriter) -> TupleWriter) -> Self {
        let nested = build(TupleWriter::new());
        self.items.push(Item::List(nested.items));
        self
    }

    /// An optional `[` ... `]` block: always emitted as a nested list,
    /// empty when every field inside was omitted (§8 property 7).
    pub fn optional(mut self, build: impl FnOnce(OptionalTupleWriter) -> OptionalTupleWriter) -> Self {
        let nested = build(OptionalTupleWriter(TupleWriter::new()));
        self.items.push(Item::List(nested.0.items));
        self
    }

    pub fn into_item(self) -> Item {
        Item::List(self.items)
    }

    pub fn write<T: Read + Write, C: Cancellation>(self, conn: &mut Connection<T, C>) -> Result<(), CoreError> {
        conn.write_item(&self.into_item())
    }
}

/// Field setters inside an optional `[...]` block: each takes an `Option`
/// and omits the element on `None` rather than writing a sentinel.
pub struct OptionalTupleWriter(TupleWriter);

impl OptionalTupleWriter {
    pub fn n(mut self, v: Option<u64>) -> Self {
        if let Some(v) = v {
            self.0 = self.0.n(v);
        }
        self
    }

    pub fn r(mut self, v: Revision) -> Self {
        if let Some(n) = v.to_wire() {
            self.0 = self.0.n(n);
        }
        self
    }

    pub fn s(mut self, v: Option<&[u8]>) -> Self {
        if let Some(v) = v {
            self.0 = self.0.s(v);
        }
        self
    }

    pub fn c(mut self, v: Option<&str>) -> Self {
        if let Some(v) = v {
            self.0 = self.0.c(v);
        }
        self
    }

    pub fn w(mut self, v: Option<&str>) -> Self {
        if let Some(v) = v {
            self.0 = self.0.w(v);
        }
        self
    }
}

/// Reads fields out of an already-decoded tuple (a list item) by
/// position, mirroring the read side of the format language. Arity and
/// kind mismatches both report `MALFORMED_DATA` (§4.1 "Failure
/// semantics").
pub struct TupleReader<'a> {
    items: &'a [Item],
}

impl<'a> TupleReader<'a> {
    pub fn new(item: &'a Item) -> Result<Self, CoreError> {
        match item {
            Item::List(items) => Ok(TupleReader { items }),
            _ => Err(malformed("expected a list for tuple read")),
        }
    }

    pub fn from_slice(items: &'a [Item]) -> Self {
        TupleReader { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn at(&self, i: usize) -> Result<&'a Item, CoreError> {
        self.items.get(i).ok_or_else(|| malformed(format!("tuple has no element at index {i}")))
    }

    pub fn raw(&self, i: usize) -> Result<&'a Item, CoreError> {
        self.at(i)
    }

    pub fn n(&self, i: usize) -> Result<u64, CoreError> {
        self.at(i)?.as_number().ok_or_else(|| malformed(format!("element {i} is not a number")))
    }

    pub fn r(&self, i: usize) -> Result<Revision, CoreError> {
        Ok(Revision::Committed(self.n(i)?))
    }

    pub fn s(&self, i: usize) -> Result<&'a [u8], CoreError> {
        self.at(i)?.as_string().ok_or_else(|| malformed(format!("element {i} is not a string")))
    }

    pub fn c(&self, i: usize) -> Result<String, CoreError> {
        let bytes = self.s(i)?;
        if bytes.contains(&0) {
            return Err(malformed(format!("element {i} contains an embedded NUL")));
        }
        String::from_utf8(bytes.to_vec()).map_err(|_| malformed(format!("element {i} is not valid UTF-8")))
    }

    pub fn w(&self, i: usize) -> Result<&'a str, CoreError> {
        self.at(i)?.as_word().ok_or_else(|| malformed(format!("element {i} is not a word")))
    }

    pub fn list(&self, i: usize) -> Result<&'a [Item], CoreError> {
        self.at(i)?.as_list().ok_or_else(|| malformed(format!("element {i} is not a list")))
    }

    /// Reads a nested `[...]` optional block as written by
    /// [`TupleWriter::optional`]: the sub-list either has zero elements
    /// (all fields were sentinels) or one (§8 property 7 in reverse).
    pub fn optional_list(&self, i: usize) -> Result<TupleReader<'a>, CoreError> {
        Ok(TupleReader::from_slice(self.list(i)?))
    }

    pub fn optional_rev(&self, i: usize) -> Result<Revision, CoreError> {
        let inner = self.optional_list(i)?;
        if inner.is_empty() {
            Ok(Revision::InTxn)
        } else {
            inner.r(0)
        }
    }
}
