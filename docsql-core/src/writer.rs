//! Streaming structured-document writers.
//!
//! A [`DocumentWriter`] receives a depth-first sequence of events (documents, arrays,
//! field names and typed scalars) and turns it into a concrete output. Two writers ship
//! with the crate:
//!
//! - [`BsonDocumentWriter`] - builds a [`bson::Document`], the form handed to executors
//! - [`JsonWriter`] - emits compact relaxed extended JSON, used for logging and tests
//!
//! Both writers reject malformed event sequences (a value without a field name inside a
//! document, a name inside an array, unbalanced ends) with [`DocSqlError::Assertion`].

use bson::{Bson, Document};

use crate::error::{DocSqlError, DocSqlResult};

/// Event sink for rendering a document tree.
pub trait DocumentWriter {
    fn start_document(&mut self) -> DocSqlResult<()>;
    fn end_document(&mut self) -> DocSqlResult<()>;
    fn start_array(&mut self) -> DocSqlResult<()>;
    fn end_array(&mut self) -> DocSqlResult<()>;

    /// Names the next value written into the current document.
    fn write_name(&mut self, name: &str) -> DocSqlResult<()>;

    fn write_string(&mut self, value: &str) -> DocSqlResult<()>;
    fn write_int32(&mut self, value: i32) -> DocSqlResult<()>;
    fn write_int64(&mut self, value: i64) -> DocSqlResult<()>;
    fn write_double(&mut self, value: f64) -> DocSqlResult<()>;
    fn write_boolean(&mut self, value: bool) -> DocSqlResult<()>;

    /// Writes the `undefined` marker.
    fn write_undefined(&mut self) -> DocSqlResult<()>;

    /// Writes the value position of a late-bound parameter.
    ///
    /// Writers that know the bound values substitute them here; by default the position
    /// is written as the `undefined` marker, the format having no placeholder of its own.
    fn write_placeholder(&mut self, _position: usize) -> DocSqlResult<()> {
        self.write_undefined()
    }

    /// Writes any other BSON value (dates, object ids, binaries) as a single unit.
    fn write_bson(&mut self, value: &Bson) -> DocSqlResult<()>;

    /// Writes a scalar through the most specific typed method available.
    fn write_scalar(&mut self, value: &Bson) -> DocSqlResult<()> {
        match value {
            Bson::String(s) => self.write_string(s),
            Bson::Int32(i) => self.write_int32(*i),
            Bson::Int64(i) => self.write_int64(*i),
            Bson::Double(d) => self.write_double(*d),
            Bson::Boolean(b) => self.write_boolean(*b),
            Bson::Undefined => self.write_undefined(),
            other => self.write_bson(other),
        }
    }
}

enum BsonFrame {
    Document {
        document: Document,
        pending_name: Option<String>,
    },
    Array(Vec<Bson>),
}

/// Builds a single [`Document`] from writer events.
///
/// # Example
///
/// ```ignore
/// use docsql_core::writer::{BsonDocumentWriter, DocumentWriter};
///
/// let mut writer = BsonDocumentWriter::new();
/// writer.start_document()?;
/// writer.write_name("limit")?;
/// writer.write_int32(0)?;
/// writer.end_document()?;
///
/// assert_eq!(writer.into_document()?, bson::doc! { "limit": 0 });
/// ```
#[derive(Default)]
pub struct BsonDocumentWriter {
    stack: Vec<BsonFrame>,
    root: Option<Document>,
}

impl BsonDocumentWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the finished root document.
    ///
    /// # Errors
    ///
    /// Returns an assertion error if no document was written or one is still open.
    pub fn into_document(self) -> DocSqlResult<Document> {
        if !self.stack.is_empty() {
            return Err(DocSqlError::assertion("document writer finished with open containers"));
        }

        self.root
            .ok_or_else(|| DocSqlError::assertion("document writer finished without a root document"))
    }

    fn append(&mut self, value: Bson) -> DocSqlResult<()> {
        match self.stack.last_mut() {
            Some(BsonFrame::Document { document, pending_name }) => {
                let name = pending_name
                    .take()
                    .ok_or_else(|| DocSqlError::assertion("value written into a document without a field name"))?;
                document.insert(name, value);
                Ok(())
            }
            Some(BsonFrame::Array(items)) => {
                items.push(value);
                Ok(())
            }
            None => Err(DocSqlError::assertion("value written outside of a document")),
        }
    }

    fn ensure_accepts_container(&self) -> DocSqlResult<()> {
        match self.stack.last() {
            Some(BsonFrame::Document { pending_name: None, .. }) => {
                Err(DocSqlError::assertion("nested container started without a field name"))
            }
            Some(_) => Ok(()),
            None if self.root.is_some() => Err(DocSqlError::assertion("root document already written")),
            None => Ok(()),
        }
    }
}

impl DocumentWriter for BsonDocumentWriter {
    fn start_document(&mut self) -> DocSqlResult<()> {
        self.ensure_accepts_container()?;
        self.stack.push(BsonFrame::Document {
            document: Document::new(),
            pending_name: None,
        });
        Ok(())
    }

    fn end_document(&mut self) -> DocSqlResult<()> {
        match self.stack.pop() {
            Some(BsonFrame::Document { document, pending_name: None }) => {
                if self.stack.is_empty() {
                    self.root = Some(document);
                    Ok(())
                } else {
                    self.append(Bson::Document(document))
                }
            }
            Some(BsonFrame::Document { pending_name: Some(name), .. }) => {
                Err(DocSqlError::assertion(format!("document ended while field {name} has no value")))
            }
            Some(BsonFrame::Array(_)) => Err(DocSqlError::assertion("end_document called inside an array")),
            None => Err(DocSqlError::assertion("end_document called without an open document")),
        }
    }

    fn start_array(&mut self) -> DocSqlResult<()> {
        if self.stack.is_empty() {
            return Err(DocSqlError::assertion("array written outside of a document"));
        }
        self.ensure_accepts_container()?;
        self.stack.push(BsonFrame::Array(Vec::new()));
        Ok(())
    }

    fn end_array(&mut self) -> DocSqlResult<()> {
        match self.stack.pop() {
            Some(BsonFrame::Array(items)) => self.append(Bson::Array(items)),
            Some(frame) => {
                self.stack.push(frame);
                Err(DocSqlError::assertion("end_array called inside a document"))
            }
            None => Err(DocSqlError::assertion("end_array called without an open array")),
        }
    }

    fn write_name(&mut self, name: &str) -> DocSqlResult<()> {
        match self.stack.last_mut() {
            Some(BsonFrame::Document { pending_name: pending @ None, .. }) => {
                *pending = Some(name.to_string());
                Ok(())
            }
            Some(BsonFrame::Document { pending_name: Some(previous), .. }) => {
                Err(DocSqlError::assertion(format!("field {name} named while field {previous} has no value")))
            }
            _ => Err(DocSqlError::assertion(format!("field {name} named outside of a document"))),
        }
    }

    fn write_string(&mut self, value: &str) -> DocSqlResult<()> {
        self.append(Bson::String(value.to_string()))
    }

    fn write_int32(&mut self, value: i32) -> DocSqlResult<()> {
        self.append(Bson::Int32(value))
    }

    fn write_int64(&mut self, value: i64) -> DocSqlResult<()> {
        self.append(Bson::Int64(value))
    }

    fn write_double(&mut self, value: f64) -> DocSqlResult<()> {
        self.append(Bson::Double(value))
    }

    fn write_boolean(&mut self, value: bool) -> DocSqlResult<()> {
        self.append(Bson::Boolean(value))
    }

    fn write_undefined(&mut self) -> DocSqlResult<()> {
        self.append(Bson::Undefined)
    }

    fn write_bson(&mut self, value: &Bson) -> DocSqlResult<()> {
        self.append(value.clone())
    }
}

enum JsonFrame {
    Document { empty: bool, named: bool },
    Array { empty: bool },
}

/// Writes compact relaxed extended JSON text.
///
/// Strings are escaped with `serde_json`; dates, object ids and binaries use the relaxed
/// extended JSON forms produced by `bson`. The `undefined` marker becomes
/// `{"$undefined":true}`.
#[derive(Default)]
pub struct JsonWriter {
    output: String,
    stack: Vec<JsonFrame>,
    finished: bool,
}

impl JsonWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the written JSON text.
    pub fn finish(self) -> DocSqlResult<String> {
        if !self.stack.is_empty() || !self.finished {
            return Err(DocSqlError::assertion("json writer finished with an incomplete document"));
        }

        Ok(self.output)
    }

    fn before_value(&mut self) -> DocSqlResult<()> {
        match self.stack.last_mut() {
            Some(JsonFrame::Document { named, .. }) => {
                if !*named {
                    return Err(DocSqlError::assertion("value written into a document without a field name"));
                }
                *named = false;
            }
            Some(JsonFrame::Array { empty }) => {
                if !*empty {
                    self.output.push(',');
                }
                *empty = false;
            }
            None => {
                return Err(DocSqlError::assertion("value written outside of a document"));
            }
        }

        Ok(())
    }

    fn write_raw_value(&mut self, text: &str) -> DocSqlResult<()> {
        self.before_value()?;
        self.output.push_str(text);
        Ok(())
    }

    fn write_extjson(&mut self, value: Bson) -> DocSqlResult<()> {
        let text = serde_json::to_string(&value.into_relaxed_extjson())?;
        self.write_raw_value(&text)
    }
}

impl DocumentWriter for JsonWriter {
    fn start_document(&mut self) -> DocSqlResult<()> {
        if self.stack.is_empty() {
            if self.finished {
                return Err(DocSqlError::assertion("root document already written"));
            }
        } else {
            self.before_value()?;
        }
        self.output.push('{');
        self.stack.push(JsonFrame::Document { empty: true, named: false });
        Ok(())
    }

    fn end_document(&mut self) -> DocSqlResult<()> {
        match self.stack.pop() {
            Some(JsonFrame::Document { named: false, .. }) => {
                self.output.push('}');
                self.finished = self.stack.is_empty();
                Ok(())
            }
            Some(JsonFrame::Document { named: true, .. }) => {
                Err(DocSqlError::assertion("document ended while a field has no value"))
            }
            Some(JsonFrame::Array { .. }) => Err(DocSqlError::assertion("end_document called inside an array")),
            None => Err(DocSqlError::assertion("end_document called without an open document")),
        }
    }

    fn start_array(&mut self) -> DocSqlResult<()> {
        self.before_value()?;
        self.output.push('[');
        self.stack.push(JsonFrame::Array { empty: true });
        Ok(())
    }

    fn end_array(&mut self) -> DocSqlResult<()> {
        match self.stack.pop() {
            Some(JsonFrame::Array { .. }) => {
                self.output.push(']');
                Ok(())
            }
            Some(frame) => {
                self.stack.push(frame);
                Err(DocSqlError::assertion("end_array called inside a document"))
            }
            None => Err(DocSqlError::assertion("end_array called without an open array")),
        }
    }

    fn write_name(&mut self, name: &str) -> DocSqlResult<()> {
        let key = serde_json::to_string(name)?;

        match self.stack.last_mut() {
            Some(JsonFrame::Document { empty, named: named @ false }) => {
                if !*empty {
                    self.output.push(',');
                }
                *empty = false;
                *named = true;
            }
            Some(JsonFrame::Document { named: true, .. }) => {
                return Err(DocSqlError::assertion(format!("field {name} named while another field has no value")));
            }
            _ => return Err(DocSqlError::assertion(format!("field {name} named outside of a document"))),
        }

        self.output.push_str(&key);
        self.output.push(':');
        Ok(())
    }

    fn write_string(&mut self, value: &str) -> DocSqlResult<()> {
        let text = serde_json::to_string(value)?;
        self.write_raw_value(&text)
    }

    fn write_int32(&mut self, value: i32) -> DocSqlResult<()> {
        self.write_raw_value(&value.to_string())
    }

    fn write_int64(&mut self, value: i64) -> DocSqlResult<()> {
        self.write_raw_value(&value.to_string())
    }

    fn write_double(&mut self, value: f64) -> DocSqlResult<()> {
        self.write_extjson(Bson::Double(value))
    }

    fn write_boolean(&mut self, value: bool) -> DocSqlResult<()> {
        self.write_raw_value(if value { "true" } else { "false" })
    }

    fn write_undefined(&mut self) -> DocSqlResult<()> {
        self.write_raw_value(r#"{"$undefined":true}"#)
    }

    fn write_bson(&mut self, value: &Bson) -> DocSqlResult<()> {
        self.write_extjson(value.clone())
    }
}
