//! XML schema snapshot files.
//!
//! A snapshot captures one layer's objects so it can be reloaded later as an
//! [`InMemoryLayer`] or produced from a merged [`LayeredDatabase`]:
//!
//! ```xml
//! <SchemaSnapshot name="base" schema="dbo">
//!   <Table schema="dbo" name="Users">
//!     <Column name="Id" type="int" nullable="false" identity="true"/>
//!     <Column name="Code" type="char(4)">
//!       <Computed>UPPER([Name])</Computed>
//!     </Column>
//!     <PrimaryKey name="PK_Users"><KeyColumn name="Id"/></PrimaryKey>
//!     <Check name="CK_Users_Code"><Definition>LEN([Code]) = 4</Definition></Check>
//!   </Table>
//!   <Synonym schema="dbo" name="People" targetSchema="dbo" targetName="Users"/>
//! </SchemaSnapshot>
//! ```
//!
//! [`LayeredDatabase`]: crate::resolver::LayeredDatabase

use std::io::Write;
use std::path::{Path, PathBuf};

use encoding_rs::WINDOWS_1252;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use roxmltree::{Document, Node};
use tracing::{debug, warn};

use crate::error::{Result, SchematicError};
use crate::identifier::{Identifier, IdentifierDefaults};
use crate::layer::{InMemoryLayer, SchemaLayer};
use crate::model::{
    DatabaseCheck, DatabaseColumn, DatabaseIndex, DatabaseKey, DatabaseRelationalKey,
    DatabaseRoutine, DatabaseSequence, DatabaseSynonym, DatabaseTable, DatabaseView,
};

const ROOT_ELEMENT: &str = "SchemaSnapshot";

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Snapshot file contents without a byte order mark. Files that are not
/// valid UTF-8 are decoded as Windows-1252.
fn read_snapshot_text(path: &Path) -> std::io::Result<String> {
    let bytes = std::fs::read(path)?;
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(&bytes);

    if let Ok(text) = std::str::from_utf8(bytes) {
        return Ok(text.to_string());
    }
    WINDOWS_1252
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(|text| {
            debug!(path = %path.display(), "Decoded snapshot as Windows-1252");
            text.into_owned()
        })
        .ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "snapshot is neither UTF-8 nor Windows-1252",
            )
        })
}

/// Load a snapshot file as an in-memory layer.
///
/// The layer is named after the root `name` attribute, falling back to the
/// file stem.
pub fn load_snapshot(path: &Path) -> Result<InMemoryLayer> {
    let content = read_snapshot_text(path).map_err(|source| SchematicError::SnapshotReadError {
        path: path.to_path_buf(),
        source,
    })?;
    let layer = parse_snapshot(&content, path)?;

    debug!(
        path = %path.display(),
        layer = layer.name(),
        tables = layer.tables.len(),
        views = layer.views.len(),
        "Loaded snapshot"
    );
    Ok(layer)
}

/// Parse snapshot XML. `path` is only used for naming and error messages.
pub fn parse_snapshot(content: &str, path: &Path) -> Result<InMemoryLayer> {
    let doc = Document::parse(content).map_err(|source| SchematicError::SnapshotParseError {
        path: path.to_path_buf(),
        source,
    })?;

    let reader = SnapshotReader { path };
    let root = doc.root_element();
    if root.tag_name().name() != ROOT_ELEMENT {
        return Err(reader.invalid(format!(
            "expected <{}> root element, found <{}>",
            ROOT_ELEMENT,
            root.tag_name().name()
        )));
    }

    let defaults = IdentifierDefaults::new(
        root.attribute("server"),
        root.attribute("database"),
        root.attribute("schema"),
    );
    let name = root
        .attribute("name")
        .map(str::to_string)
        .or_else(|| {
            path.file_stem()
                .and_then(|s| s.to_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| "snapshot".to_string());

    let mut layer = InMemoryLayer::new(name, defaults);
    for node in root.children().filter(|n| n.is_element()) {
        match node.tag_name().name() {
            "Table" => layer.tables.push(reader.table(node)?),
            "View" => layer.views.push(reader.view(node)?),
            "Sequence" => layer.sequences.push(reader.sequence(node)?),
            "Synonym" => layer.synonyms.push(DatabaseSynonym {
                name: reader.identifier(node, "")?,
                target: reader.identifier(node, "target")?,
            }),
            "Routine" => layer.routines.push(DatabaseRoutine {
                name: reader.identifier(node, "")?,
                definition: child_text(node, "Definition").unwrap_or_default(),
            }),
            other => warn!(element = other, path = %path.display(), "Skipping unknown snapshot element"),
        }
    }

    Ok(layer)
}

struct SnapshotReader<'p> {
    path: &'p Path,
}

impl SnapshotReader<'_> {
    fn invalid(&self, message: String) -> SchematicError {
        SchematicError::InvalidSnapshotFormat {
            path: self.path.to_path_buf(),
            message,
        }
    }

    fn required<'a>(&self, node: Node<'a, '_>, attr: &str) -> Result<&'a str> {
        node.attribute(attr).ok_or_else(|| {
            self.invalid(format!(
                "<{}> is missing the '{}' attribute",
                node.tag_name().name(),
                attr
            ))
        })
    }

    /// Read `server`/`database`/`schema`/`name`, or the prefixed camel-case
    /// variants (`targetSchema`, `targetName`, ...).
    fn identifier(&self, node: Node, prefix: &str) -> Result<Identifier> {
        let attr = |suffix: &str| prefixed(prefix, suffix);
        let local = self.required(node, &attr("name"))?;
        Identifier::from_parts(
            node.attribute(attr("server").as_str()),
            node.attribute(attr("database").as_str()),
            node.attribute(attr("schema").as_str()),
            local,
        )
        .map_err(|err| self.invalid(err.to_string()))
    }

    fn flag(&self, node: Node, attr: &str) -> Result<bool> {
        match node.attribute(attr) {
            None => Ok(false),
            Some(v) if v.eq_ignore_ascii_case("true") => Ok(true),
            Some(v) if v.eq_ignore_ascii_case("false") => Ok(false),
            Some(v) => Err(self.invalid(format!("'{}' is not a boolean for '{}'", v, attr))),
        }
    }

    fn number(&self, node: Node, attr: &str) -> Result<Option<i64>> {
        node.attribute(attr)
            .map(|v| {
                v.trim()
                    .parse::<i64>()
                    .map_err(|_| self.invalid(format!("'{}' is not an integer for '{}'", v, attr)))
            })
            .transpose()
    }

    fn column(&self, node: Node) -> Result<DatabaseColumn> {
        let mut column = DatabaseColumn::new(
            self.required(node, "name")?,
            node.attribute("type").unwrap_or_default(),
        );
        column.is_nullable = match node.attribute("nullable") {
            None => true,
            Some(_) => self.flag(node, "nullable")?,
        };
        column.is_identity = self.flag(node, "identity")?;
        column.default_value = text_or_attribute(node, "Default", "default");
        column.computed_definition = text_or_attribute(node, "Computed", "computed");
        column.comment = text_or_attribute(node, "Comment", "comment");
        Ok(column)
    }

    fn key(&self, node: Node) -> Result<DatabaseKey> {
        Ok(DatabaseKey {
            name: node.attribute("name").map(str::to_string),
            columns: self.names(node, "KeyColumn")?,
        })
    }

    fn names(&self, node: Node, element: &str) -> Result<Vec<String>> {
        node.children()
            .filter(|n| n.has_tag_name(element))
            .map(|n| self.required(n, "name").map(str::to_string))
            .collect()
    }

    fn table(&self, node: Node) -> Result<DatabaseTable> {
        let mut table = DatabaseTable::new(self.identifier(node, "")?);
        table.comment = child_text(node, "Comment");

        for child in node.children().filter(|n| n.is_element()) {
            match child.tag_name().name() {
                "Column" => table.columns.push(self.column(child)?),
                "PrimaryKey" => table.primary_key = Some(self.key(child)?),
                "UniqueKey" => table.unique_keys.push(self.key(child)?),
                "ForeignKey" => {
                    let mut child_columns = Vec::new();
                    let mut parent_columns = Vec::new();
                    for pair in child.children().filter(|n| n.has_tag_name("ColumnPair")) {
                        child_columns.push(self.required(pair, "column")?.to_string());
                        parent_columns.push(self.required(pair, "parentColumn")?.to_string());
                    }
                    table.foreign_keys.push(DatabaseRelationalKey {
                        name: child.attribute("name").map(str::to_string),
                        child_columns,
                        parent_table: self.identifier(child, "parent")?,
                        parent_columns,
                    });
                }
                "Index" => table.indexes.push(DatabaseIndex {
                    name: self.required(child, "name")?.to_string(),
                    columns: self.names(child, "KeyColumn")?,
                    included_columns: self.names(child, "IncludedColumn")?,
                    is_unique: self.flag(child, "unique")?,
                }),
                "Check" => {
                    let definition = text_or_attribute(child, "Definition", "definition")
                        .ok_or_else(|| self.invalid("<Check> has no definition".to_string()))?;
                    table.checks.push(DatabaseCheck {
                        name: child.attribute("name").map(str::to_string),
                        definition,
                    });
                }
                "Comment" => {}
                other => warn!(element = other, table = %table.name, "Skipping unknown table element"),
            }
        }

        Ok(table)
    }

    fn view(&self, node: Node) -> Result<DatabaseView> {
        let mut view = DatabaseView::new(
            self.identifier(node, "")?,
            child_text(node, "Definition").unwrap_or_default(),
        );
        view.is_materialized = self.flag(node, "materialized")?;
        view.comment = child_text(node, "Comment");
        for column in node.children().filter(|n| n.has_tag_name("Column")) {
            view.columns.push(self.column(column)?);
        }
        Ok(view)
    }

    fn sequence(&self, node: Node) -> Result<DatabaseSequence> {
        let mut sequence = DatabaseSequence::new(self.identifier(node, "")?);
        if let Some(start) = self.number(node, "start")? {
            sequence.start = start;
        }
        if let Some(increment) = self.number(node, "increment")? {
            sequence.increment = increment;
        }
        sequence.min_value = self.number(node, "min")?;
        sequence.max_value = self.number(node, "max")?;
        sequence.cache = self.number(node, "cache")?;
        sequence.cycle = self.flag(node, "cycle")?;
        Ok(sequence)
    }
}

fn prefixed(prefix: &str, suffix: &str) -> String {
    if prefix.is_empty() {
        return suffix.to_string();
    }
    let mut chars = suffix.chars();
    match chars.next() {
        Some(first) => format!("{}{}{}", prefix, first.to_ascii_uppercase(), chars.as_str()),
        None => prefix.to_string(),
    }
}

/// Text of the first `element` child; an empty element yields `""`.
fn child_text(node: Node, element: &str) -> Option<String> {
    node.children()
        .find(|n| n.has_tag_name(element))
        .map(|n| n.text().unwrap_or_default().to_string())
}

/// Child element text, falling back to a single-line attribute in
/// hand-written files.
fn text_or_attribute(node: Node, element: &str, attr: &str) -> Option<String> {
    child_text(node, element).or_else(|| node.attribute(attr).map(str::to_string))
}

/// Write every object of `layer` as a snapshot document.
pub fn write_snapshot<W: Write>(layer: &dyn SchemaLayer, name: &str, out: W) -> Result<()> {
    let mut writer = Writer::new_with_indent(out, b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

    let defaults = layer.identifier_defaults();
    let mut root = BytesStart::new(ROOT_ELEMENT);
    root.push_attribute(("name", name));
    push_optional(&mut root, "server", defaults.server.as_deref());
    push_optional(&mut root, "database", defaults.database.as_deref());
    push_optional(&mut root, "schema", defaults.schema.as_deref());
    writer.write_event(Event::Start(root))?;

    for table in wrap_layer(layer, layer.all_tables())? {
        write_table(&mut writer, &table)?;
    }
    for view in wrap_layer(layer, layer.all_views())? {
        write_view(&mut writer, &view)?;
    }
    for sequence in wrap_layer(layer, layer.all_sequences())? {
        let mut elem = identifier_element("Sequence", &sequence.name, "");
        elem.push_attribute(("start", sequence.start.to_string().as_str()));
        elem.push_attribute(("increment", sequence.increment.to_string().as_str()));
        push_optional(&mut elem, "min", sequence.min_value.map(|v| v.to_string()).as_deref());
        push_optional(&mut elem, "max", sequence.max_value.map(|v| v.to_string()).as_deref());
        push_optional(&mut elem, "cache", sequence.cache.map(|v| v.to_string()).as_deref());
        if sequence.cycle {
            elem.push_attribute(("cycle", "true"));
        }
        writer.write_event(Event::Empty(elem))?;
    }
    for synonym in wrap_layer(layer, layer.all_synonyms())? {
        let mut elem = identifier_element("Synonym", &synonym.name, "");
        push_identifier(&mut elem, &synonym.target, "target");
        writer.write_event(Event::Empty(elem))?;
    }
    for routine in wrap_layer(layer, layer.all_routines())? {
        writer.write_event(Event::Start(identifier_element("Routine", &routine.name, "")))?;
        write_text_element(&mut writer, "Definition", &routine.definition)?;
        writer.write_event(Event::End(BytesEnd::new("Routine")))?;
    }

    writer.write_event(Event::End(BytesEnd::new(ROOT_ELEMENT)))?;
    Ok(())
}

/// Write a snapshot to `path`, replacing any existing file.
pub fn write_snapshot_file(layer: &dyn SchemaLayer, name: &str, path: &Path) -> Result<PathBuf> {
    let mut buffer = Vec::new();
    write_snapshot(layer, name, &mut buffer)?;
    std::fs::write(path, buffer).map_err(|err| SchematicError::SnapshotWriteError {
        message: format!("{}: {}", path.display(), err),
    })?;
    Ok(path.to_path_buf())
}

fn wrap_layer<T>(layer: &dyn SchemaLayer, result: crate::layer::LayerResult<T>) -> Result<T> {
    result.map_err(|source| SchematicError::LayerFailure {
        layer: layer.name().to_string(),
        source,
    })
}

fn push_optional(elem: &mut BytesStart, attr: &str, value: Option<&str>) {
    if let Some(value) = value {
        elem.push_attribute((attr, value));
    }
}

fn push_identifier(elem: &mut BytesStart, name: &Identifier, prefix: &str) {
    push_optional(elem, &prefixed(prefix, "server"), name.server());
    push_optional(elem, &prefixed(prefix, "database"), name.database());
    push_optional(elem, &prefixed(prefix, "schema"), name.schema());
    elem.push_attribute((prefixed(prefix, "name").as_str(), name.local()));
}

fn identifier_element<'a>(tag: &'a str, name: &Identifier, prefix: &str) -> BytesStart<'a> {
    let mut elem = BytesStart::new(tag);
    push_identifier(&mut elem, name, prefix);
    elem
}

fn write_text_element<W: Write>(writer: &mut Writer<W>, tag: &str, text: &str) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(tag)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(tag)))?;
    Ok(())
}

/// Column metadata goes in attributes; SQL text and comments go in child
/// elements so line breaks and tabs survive a reload.
fn write_column<W: Write>(writer: &mut Writer<W>, column: &DatabaseColumn) -> Result<()> {
    let mut elem = BytesStart::new("Column");
    elem.push_attribute(("name", column.name.as_str()));
    elem.push_attribute(("type", column.data_type.as_str()));
    if !column.is_nullable {
        elem.push_attribute(("nullable", "false"));
    }
    if column.is_identity {
        elem.push_attribute(("identity", "true"));
    }

    let texts = [
        ("Default", column.default_value.as_deref()),
        ("Computed", column.computed_definition.as_deref()),
        ("Comment", column.comment.as_deref()),
    ];
    if texts.iter().all(|(_, text)| text.is_none()) {
        writer.write_event(Event::Empty(elem))?;
        return Ok(());
    }

    writer.write_event(Event::Start(elem))?;
    for (tag, text) in texts {
        if let Some(text) = text {
            write_text_element(writer, tag, text)?;
        }
    }
    writer.write_event(Event::End(BytesEnd::new("Column")))?;
    Ok(())
}

fn write_key<W: Write>(writer: &mut Writer<W>, tag: &str, key: &DatabaseKey) -> Result<()> {
    let mut elem = BytesStart::new(tag);
    push_optional(&mut elem, "name", key.name.as_deref());
    writer.write_event(Event::Start(elem))?;
    for column in &key.columns {
        let col = BytesStart::new("KeyColumn").with_attributes([("name", column.as_str())]);
        writer.write_event(Event::Empty(col))?;
    }
    writer.write_event(Event::End(BytesEnd::new(tag)))?;
    Ok(())
}

fn write_table<W: Write>(writer: &mut Writer<W>, table: &DatabaseTable) -> Result<()> {
    writer.write_event(Event::Start(identifier_element("Table", &table.name, "")))?;

    if let Some(comment) = &table.comment {
        write_text_element(writer, "Comment", comment)?;
    }
    for column in &table.columns {
        write_column(writer, column)?;
    }
    if let Some(pk) = &table.primary_key {
        write_key(writer, "PrimaryKey", pk)?;
    }
    for uk in &table.unique_keys {
        write_key(writer, "UniqueKey", uk)?;
    }
    for fk in &table.foreign_keys {
        let mut elem = BytesStart::new("ForeignKey");
        push_optional(&mut elem, "name", fk.name.as_deref());
        push_identifier(&mut elem, &fk.parent_table, "parent");
        writer.write_event(Event::Start(elem))?;
        for (child, parent) in fk.column_pairs() {
            let pair = BytesStart::new("ColumnPair")
                .with_attributes([("column", child), ("parentColumn", parent)]);
            writer.write_event(Event::Empty(pair))?;
        }
        writer.write_event(Event::End(BytesEnd::new("ForeignKey")))?;
    }
    for index in &table.indexes {
        let mut elem = BytesStart::new("Index");
        elem.push_attribute(("name", index.name.as_str()));
        if index.is_unique {
            elem.push_attribute(("unique", "true"));
        }
        writer.write_event(Event::Start(elem))?;
        for column in &index.columns {
            let col = BytesStart::new("KeyColumn").with_attributes([("name", column.as_str())]);
            writer.write_event(Event::Empty(col))?;
        }
        for column in &index.included_columns {
            let col =
                BytesStart::new("IncludedColumn").with_attributes([("name", column.as_str())]);
            writer.write_event(Event::Empty(col))?;
        }
        writer.write_event(Event::End(BytesEnd::new("Index")))?;
    }
    for check in &table.checks {
        let mut elem = BytesStart::new("Check");
        push_optional(&mut elem, "name", check.name.as_deref());
        writer.write_event(Event::Start(elem))?;
        write_text_element(writer, "Definition", &check.definition)?;
        writer.write_event(Event::End(BytesEnd::new("Check")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("Table")))?;
    Ok(())
}

fn write_view<W: Write>(writer: &mut Writer<W>, view: &DatabaseView) -> Result<()> {
    let mut elem = identifier_element("View", &view.name, "");
    if view.is_materialized {
        elem.push_attribute(("materialized", "true"));
    }
    writer.write_event(Event::Start(elem))?;
    write_text_element(writer, "Definition", &view.definition)?;
    if let Some(comment) = &view.comment {
        write_text_element(writer, "Comment", comment)?;
    }
    for column in &view.columns {
        write_column(writer, column)?;
    }
    writer.write_event(Event::End(BytesEnd::new("View")))?;
    Ok(())
}
