//! Intermediate model types: the bridge between clang extraction and C++ emission.
//!
//! These types are clang-independent, so the classifier and the emitters can
//! be tested against hand-built header sets without libclang.

use std::path::PathBuf;

/// Everything extracted from one parse of the header set.
#[derive(Debug, Default, Clone)]
pub struct HeaderSet {
    pub structs: Vec<StructDef>,
    pub enums: Vec<EnumDef>,
    pub functions: Vec<FunctionDef>,
    pub constants: Vec<ConstantDef>,
    pub globals: Vec<GlobalDef>,
}

/// Source position of a declaration. Used as the declaration's identity.
#[derive(Debug, Default, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Location {
    pub file: PathBuf,
    pub line: u32,
}

/// A C struct or union. Forward-declared structs have `complete == false`
/// and no fields.
#[derive(Debug, Clone)]
pub struct StructDef {
    pub name: String,
    pub complete: bool,
    pub is_union: bool,
    pub fields: Vec<FieldDef>,
    pub location: Location,
}

impl StructDef {
    pub fn new(name: &str, fields: Vec<FieldDef>) -> Self {
        StructDef {
            name: name.to_string(),
            complete: true,
            is_union: false,
            fields,
            location: Location::default(),
        }
    }

    pub fn opaque(name: &str) -> Self {
        StructDef {
            name: name.to_string(),
            complete: false,
            is_union: false,
            fields: Vec::new(),
            location: Location::default(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A single struct field.
#[derive(Debug, Clone)]
pub struct FieldDef {
    pub name: String,
    pub ty: CType,
    /// If this is a bitfield, the width in bits.
    pub bitfield_width: Option<usize>,
}

impl FieldDef {
    pub fn new(name: &str, ty: CType) -> Self {
        FieldDef {
            name: name.to_string(),
            ty,
            bitfield_width: None,
        }
    }
}

/// A named C enum.
#[derive(Debug, Clone)]
pub struct EnumDef {
    pub name: String,
    pub variants: Vec<EnumVariant>,
    pub location: Location,
}

/// A single enum variant.
#[derive(Debug, Clone)]
pub struct EnumVariant {
    pub name: String,
    pub value: i64,
}

/// A C function declaration.
#[derive(Debug, Clone)]
pub struct FunctionDef {
    pub name: String,
    pub return_type: CType,
    pub params: Vec<ParamDef>,
    pub variadic: bool,
    /// Raw doc comment attached to the declaration, if any.
    pub comment: Option<String>,
    pub location: Location,
}

impl FunctionDef {
    pub fn new(name: &str, return_type: CType, params: Vec<ParamDef>) -> Self {
        FunctionDef {
            name: name.to_string(),
            return_type,
            params,
            variadic: false,
            comment: None,
            location: Location::default(),
        }
    }

    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }
}

/// A function parameter.
#[derive(Debug, Clone)]
pub struct ParamDef {
    pub name: String,
    pub ty: CType,
}

impl ParamDef {
    pub fn new(name: &str, ty: CType) -> Self {
        ParamDef {
            name: name.to_string(),
            ty,
        }
    }
}

/// A `#define` constant or a variant of an anonymous enum.
#[derive(Debug, Clone)]
pub struct ConstantDef {
    pub name: String,
    pub value: ConstantValue,
}

/// Value of a constant.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstantValue {
    Signed(i64),
    Unsigned(u64),
    Float(f64),
}

impl ConstantValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ConstantValue::Signed(v) => Some(*v),
            ConstantValue::Unsigned(v) => i64::try_from(*v).ok(),
            ConstantValue::Float(_) => None,
        }
    }
}

/// An `extern` global variable, e.g. `extern const fz_matrix fz_identity;`.
#[derive(Debug, Clone)]
pub struct GlobalDef {
    pub name: String,
    pub ty: CType,
    pub location: Location,
}

/// A C type, spelled the way the header spells it.
///
/// Primitives keep their C spelling (`long` and `long long` stay distinct)
/// because the emitted C++ must match the C declarations exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CType {
    Void,
    Bool,
    Char,
    SChar,
    UChar,
    Short,
    UShort,
    Int,
    UInt,
    Long,
    ULong,
    LongLong,
    ULongLong,
    Float,
    Double,
    LongDouble,
    /// Pointer to a type. `is_const` indicates `const T*`.
    Ptr {
        pointee: Box<CType>,
        is_const: bool,
    },
    /// Fixed-size array: `T[N]`.
    Array { element: Box<CType>, len: usize },
    /// A typedef name. `resolved` holds the canonical type from clang.
    Named {
        name: String,
        resolved: Option<Box<CType>>,
    },
    /// A struct or union. `complete` is false for forward declarations.
    Record { name: String, complete: bool },
    Enum { name: String },
    /// A function type; pointers to functions are `Ptr { FnPtr }`.
    FnPtr {
        return_type: Box<CType>,
        params: Vec<CType>,
        variadic: bool,
    },
}

impl CType {
    pub fn ptr(pointee: CType) -> CType {
        CType::Ptr {
            pointee: Box::new(pointee),
            is_const: false,
        }
    }

    pub fn const_ptr(pointee: CType) -> CType {
        CType::Ptr {
            pointee: Box::new(pointee),
            is_const: true,
        }
    }

    pub fn record(name: &str) -> CType {
        CType::Record {
            name: name.to_string(),
            complete: true,
        }
    }

    /// `typedef struct name name;` as MuPDF declares its structs.
    pub fn struct_typedef(name: &str) -> CType {
        CType::Named {
            name: name.to_string(),
            resolved: Some(Box::new(CType::record(name))),
        }
    }

    pub fn named(name: &str, resolved: CType) -> CType {
        CType::Named {
            name: name.to_string(),
            resolved: Some(Box::new(resolved)),
        }
    }

    /// Peel typedef layers. Typedefs without a resolved type are returned
    /// unchanged.
    pub fn strip_typedefs(&self) -> &CType {
        let mut ty = self;
        while let CType::Named {
            resolved: Some(inner),
            ..
        } = ty
        {
            ty = inner;
        }
        ty
    }

    /// The pointee of a pointer (after stripping typedefs on `self`), and
    /// whether it is const-qualified.
    pub fn pointee(&self) -> Option<(&CType, bool)> {
        match self.strip_typedefs() {
            CType::Ptr { pointee, is_const } => Some((pointee, *is_const)),
            _ => None,
        }
    }

    /// The struct name if this type is (a typedef of) a record.
    pub fn record_name(&self) -> Option<&str> {
        match self.strip_typedefs() {
            CType::Record { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self.strip_typedefs(), CType::Void)
    }

    pub fn is_enum(&self) -> bool {
        matches!(self.strip_typedefs(), CType::Enum { .. })
    }

    pub fn is_fn(&self) -> bool {
        matches!(self.strip_typedefs(), CType::FnPtr { .. })
    }

    /// True for `char`, `signed char` and `unsigned char`.
    pub fn is_char(&self) -> bool {
        matches!(
            self.strip_typedefs(),
            CType::Char | CType::SChar | CType::UChar
        )
    }

    /// True for the stdio `FILE` type, however the libc spells its struct.
    pub fn is_file(&self) -> bool {
        if let CType::Named { name, .. } = self
            && name == "FILE"
        {
            return true;
        }
        matches!(self.record_name(), Some("_IO_FILE" | "__sFILE" | "_iobuf"))
    }

    /// Return and parameter types if this is a pointer to a function.
    pub fn fn_pointer(&self) -> Option<(&CType, &[CType])> {
        let (pointee, _) = self.pointee()?;
        match pointee.strip_typedefs() {
            CType::FnPtr {
                return_type,
                params,
                ..
            } => Some((return_type, params)),
            _ => None,
        }
    }
}
