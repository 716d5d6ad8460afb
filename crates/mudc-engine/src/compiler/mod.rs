//! The compiler core: one context that executes statements in textual
//! order and assembles the machine image at the end.

pub mod class;
pub mod driver;
pub mod error;
pub mod eval;
pub mod image;
pub mod layout;
pub mod object;
pub mod region;
pub mod symbol;
pub mod value;

pub use class::{ClassDescriptor, ClassTable, CLASS_LIMIT};
pub use driver::{Diagnostic, DiagnosticKind, Session, SessionError, SourceFile};
pub use error::CompileError;
pub use eval::{evaluate, ClassKinds};
pub use image::{decode, encode, Image, ImageError, MemoryMap, Segment};
pub use layout::{allocate, Field, PendingField};
pub use object::{ObjectInstance, ObjectTable, NOID_LIMIT};
pub use region::{Asymmetry, Direction, IndirectEntry, IndirectTable, ResolvedRegion};
pub use symbol::{RedefinePolicy, Symbol, SymbolDef, SymbolTable};
pub use value::Value;

use crate::parser::{Property, Statement};

/// What to do after a statement fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Stop at the first error.
    #[default]
    Abort,
    /// Report the error, skip the statement, keep going.
    Continue,
}

/// Knobs for one compilation.
#[derive(Debug, Clone, Copy)]
pub struct CompilerOptions {
    pub error_policy: ErrorPolicy,
    pub redefine_policy: RedefinePolicy,
    pub memory_map: MemoryMap,
    pub kinds: ClassKinds,
    /// Maximum `include` nesting depth; catches include cycles.
    pub include_limit: usize,
}

impl CompilerOptions {
    /// Depth the original's fixed input stack allowed.
    pub const DEFAULT_INCLUDE_LIMIT: usize = 16;
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            error_policy: ErrorPolicy::default(),
            redefine_policy: RedefinePolicy::default(),
            memory_map: MemoryMap::default(),
            kinds: ClassKinds::default(),
            include_limit: Self::DEFAULT_INCLUDE_LIMIT,
        }
    }
}

/// Everything `finish` produces.
#[derive(Debug, Clone, PartialEq)]
pub struct CompileOutput {
    pub image: Image,
    /// The image in segment-stream encoding.
    pub stream: Vec<u8>,
    pub regions: Vec<ResolvedRegion>,
    pub asymmetries: Vec<Asymmetry>,
    /// `>`-lines in source order, for the sidecar raw file.
    pub raw_output: Vec<String>,
}

/// One compilation context. Statements mutate it strictly in order;
/// a failed statement leaves all previously built state intact.
#[derive(Debug)]
pub struct Compiler {
    options: CompilerOptions,
    symbols: SymbolTable,
    classes: ClassTable,
    objects: ObjectTable,
    indirect: IndirectTable,
    raw_output: Vec<String>,
}

/// One pending connectivity record, applied once its object exists.
enum Connectivity {
    Link(Direction, u8),
    Multi(u8),
    Rotation(u8),
}

impl Compiler {
    pub fn new(options: CompilerOptions) -> Self {
        Self {
            options,
            symbols: SymbolTable::new(options.redefine_policy),
            classes: ClassTable::new(),
            objects: ObjectTable::new(),
            indirect: IndirectTable::new(),
            raw_output: Vec::new(),
        }
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn classes(&self) -> &ClassTable {
        &self.classes
    }

    pub fn objects(&self) -> &ObjectTable {
        &self.objects
    }

    /// Layout listings for every defined class, definition order.
    pub fn listings(&self) -> String {
        let mut out = String::new();
        for class in self.classes.iter() {
            out.push_str(&class.listing());
        }
        out
    }

    /// Execute one statement.
    ///
    /// `include` needs a source loader and is the driver's job; fed here
    /// directly it fails.
    pub fn execute(&mut self, statement: &Statement) -> Result<(), CompileError> {
        match statement {
            Statement::Raw { text, .. } => {
                self.raw_output.push(text.clone());
                Ok(())
            }
            Statement::Assignment { name, expr, span } => {
                let value = evaluate(expr, &self.symbols, self.options.kinds)?;
                self.symbols
                    .declare(name, SymbolDef::Variable(value), *span)
            }
            Statement::Include { path, span } => Err(CompileError::IncludeFailed {
                path: path.clone(),
                reason: "no source loader in this context".to_string(),
                span: *span,
            }),
            Statement::Define {
                class_id,
                name,
                fields,
                span,
            } => {
                // Checked up front so a rejected name does not leave an
                // orphaned descriptor in the class table.
                if !self.symbols.can_declare(name) {
                    return Err(CompileError::DuplicateSymbol {
                        name: name.clone(),
                        span: *span,
                    });
                }
                let id_value = evaluate(class_id, &self.symbols, self.options.kinds)?;
                let id = id_value.as_int().ok_or(CompileError::TypeMismatch {
                    expected: "integer",
                    actual: id_value.type_name(),
                    span: class_id.span(),
                })?;
                let class = self.classes.define(
                    id,
                    name,
                    fields.as_deref(),
                    &self.symbols,
                    self.options.kinds,
                    *span,
                )?;
                let class_id = class.id;
                self.symbols.declare(name, SymbolDef::Class(class_id), *span)
            }
            Statement::Use {
                class_name,
                instance_name,
                id_expr,
                properties,
                span,
            } => self.execute_use(class_name, instance_name.as_deref(), id_expr.as_ref(), properties, *span),
        }
    }

    fn execute_use(
        &mut self,
        class_name: &str,
        instance_name: Option<&str>,
        id_expr: Option<&crate::parser::Expr>,
        properties: &[Property],
        span: crate::parser::Span,
    ) -> Result<(), CompileError> {
        let class_id = match self.symbols.lookup(class_name) {
            Some(Symbol {
                def: SymbolDef::Class(id),
                ..
            }) => *id,
            _ => {
                return Err(CompileError::UnknownClass {
                    name: class_name.to_string(),
                    span,
                })
            }
        };
        // Cloned so connectivity recording below can borrow the tables.
        let class = self
            .classes
            .by_id(class_id)
            .ok_or(CompileError::UnknownClass {
                name: class_name.to_string(),
                span,
            })?
            .clone();

        if let Some(name) = instance_name {
            // Checked before connectivity recording can leave entries
            // behind for an object that never materializes.
            if !self.symbols.can_declare(name) {
                return Err(CompileError::DuplicateSymbol {
                    name: name.to_string(),
                    span,
                });
            }
        }

        let explicit = match id_expr {
            Some(expr) => {
                let value = evaluate(expr, &self.symbols, self.options.kinds)?;
                let id = value
                    .reference_id()
                    .or_else(|| value.as_int())
                    .ok_or(CompileError::TypeMismatch {
                        expected: "integer",
                        actual: value.type_name(),
                        span: expr.span(),
                    })?;
                Some(id)
            }
            None => None,
        };
        let noid = self.objects.allocate_noid(explicit, span)?;

        // Build the whole state vector and the connectivity records
        // before touching any table, so a failing property leaves no
        // half-made object behind.
        let mut state = class.prototype.clone();
        let mut connectivity = Vec::new();
        let is_region = class_id == self.options.kinds.region_class;
        for property in properties {
            if is_region && self.classify_connectivity(property, &mut connectivity)? {
                // connectivity names may still be backed by a real field
                if class.field(&property.name).is_none() {
                    continue;
                }
            }
            let field =
                class
                    .field(&property.name)
                    .ok_or_else(|| CompileError::UnknownField {
                        class: class.name.clone(),
                        name: property.name.clone(),
                        span: property.span,
                    })?;
            class::write_field_values(
                &mut state,
                field,
                &property.values,
                &self.symbols,
                self.options.kinds,
            )?;
        }

        if let Some(name) = instance_name {
            self.symbols.declare(
                name,
                SymbolDef::Object {
                    class: class_id,
                    noid,
                },
                span,
            )?;
        }
        self.objects.insert(ObjectInstance {
            noid,
            class_id,
            name: instance_name.map(str::to_string),
            state,
            span,
        });
        for record in connectivity {
            match record {
                Connectivity::Link(direction, neighbor) => {
                    self.indirect.record_link(noid, direction, neighbor)
                }
                Connectivity::Multi(neighbor) => self.indirect.record_multi(noid, neighbor),
                Connectivity::Rotation(turns) => self.indirect.record_rotation(noid, turns),
            }
        }
        Ok(())
    }

    /// Intercept a region-connectivity property during pass one.
    /// Returns whether the property was one of them.
    fn classify_connectivity(
        &self,
        property: &Property,
        records: &mut Vec<Connectivity>,
    ) -> Result<bool, CompileError> {
        if let Some(direction) = Direction::from_name(&property.name) {
            for expr in &property.values {
                let neighbor = self.evaluate_noid(expr)?;
                records.push(Connectivity::Link(direction, neighbor));
            }
            return Ok(true);
        }
        match property.name.as_str() {
            "multi" => {
                for expr in &property.values {
                    let neighbor = self.evaluate_noid(expr)?;
                    records.push(Connectivity::Multi(neighbor));
                }
                Ok(true)
            }
            "rot" => {
                for expr in &property.values {
                    let value = evaluate(expr, &self.symbols, self.options.kinds)?;
                    let turns = value.as_int().ok_or(CompileError::TypeMismatch {
                        expected: "integer",
                        actual: value.type_name(),
                        span: expr.span(),
                    })?;
                    records.push(Connectivity::Rotation((turns & 3) as u8));
                }
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn evaluate_noid(&self, expr: &crate::parser::Expr) -> Result<u8, CompileError> {
        let value = evaluate(expr, &self.symbols, self.options.kinds)?;
        let id = value
            .reference_id()
            .or_else(|| value.as_int())
            .ok_or(CompileError::TypeMismatch {
                expected: "object reference",
                actual: value.type_name(),
                span: expr.span(),
            })?;
        if !(0..NOID_LIMIT as i64).contains(&id) {
            return Err(CompileError::ObjectIdOutOfRange {
                id,
                span: expr.span(),
            });
        }
        Ok(id as u8)
    }

    /// Free an object's slot. The instance stays recoverable through
    /// [`Compiler::undelete_object`] until the next deletion.
    pub fn delete_object(&mut self, noid: u8) -> bool {
        self.objects.delete(noid)
    }

    /// Restore the most recently deleted object.
    pub fn undelete_object(&mut self) -> Result<Option<u8>, CompileError> {
        self.objects.undelete()
    }

    /// Resolve region connectivity, place objects, and serialize.
    /// Leaves the tables intact so listings stay available and a
    /// second call produces the same output.
    pub fn finish(&mut self) -> Result<CompileOutput, ImageError> {
        let (regions, asymmetries) = self.indirect.clone().resolve();
        let image = image::place(self.objects.iter(), &self.options.memory_map)?;
        let stream = image::encode(&image);
        Ok(CompileOutput {
            image,
            stream,
            regions,
            asymmetries,
            raw_output: self.raw_output.clone(),
        })
    }
}
