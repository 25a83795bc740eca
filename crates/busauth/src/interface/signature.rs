// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Wire type signature validation.
//!
//! ```text
//! basic   := y b n q i u x t d s o g h
//! single  := basic | v | a single | a{ basic single } | ( single+ )
//! sig     := single*            (at most 255 bytes)
//! ```

use thiserror::Error;

/// Maximum signature length in bytes.
pub const MAX_SIGNATURE_LEN: usize = 255;
/// Maximum array nesting.
pub const MAX_ARRAY_DEPTH: u32 = 32;
/// Maximum struct / dict-entry nesting.
pub const MAX_STRUCT_DEPTH: u32 = 32;

/// Signature validation errors. Positions are byte offsets.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("signature is {0} bytes (max 255)")]
    TooLong(usize),

    #[error("signature ends inside a container")]
    UnexpectedEnd,

    #[error("invalid type code {0:?} at {1}")]
    InvalidCode(char, usize),

    #[error("empty struct at {0}")]
    EmptyStruct(usize),

    #[error("dict entry key at {0} is not a basic type")]
    DictKeyNotBasic(usize),

    #[error("dict entry at {0} is not an array element")]
    DictOutsideArray(usize),

    #[error("dict entry at {0} must hold exactly a key and a value")]
    BadDictEntry(usize),

    #[error("unbalanced {0:?} at {1}")]
    UnbalancedClose(char, usize),

    #[error("arrays nested deeper than 32")]
    ArrayTooDeep,

    #[error("structs nested deeper than 32")]
    StructTooDeep,
}

/// `true` for fixed-size and string-like basic type codes.
pub fn is_basic(code: u8) -> bool {
    matches!(
        code,
        b'y' | b'b' | b'n' | b'q' | b'i' | b'u' | b'x' | b't' | b'd' | b's' | b'o' | b'g' | b'h'
    )
}

/// Validate a signature (any number of complete types, including none).
pub fn validate(signature: &str) -> Result<(), SignatureError> {
    split(signature).map(|_| ())
}

/// Split a signature into its complete types.
///
/// `"sa{sv}(ii)"` yields `["s", "a{sv}", "(ii)"]`.
pub fn split(signature: &str) -> Result<Vec<&str>, SignatureError> {
    if signature.len() > MAX_SIGNATURE_LEN {
        return Err(SignatureError::TooLong(signature.len()));
    }

    let mut parser = Parser {
        bytes: signature.as_bytes(),
        pos: 0,
        array_depth: 0,
        struct_depth: 0,
    };

    let mut types = Vec::new();
    while parser.pos < parser.bytes.len() {
        let start = parser.pos;
        parser.complete_type()?;
        // Type codes are ASCII, so byte offsets are char boundaries.
        types.push(&signature[start..parser.pos]);
    }
    Ok(types)
}

/// `true` if the signature is exactly one complete type.
pub fn is_single_complete_type(signature: &str) -> bool {
    matches!(split(signature), Ok(types) if types.len() == 1)
}

struct Parser<'a> {
    bytes: &'a [u8],
    pos: usize,
    array_depth: u32,
    struct_depth: u32,
}

impl Parser<'_> {
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<u8> {
        let code = self.peek()?;
        self.pos += 1;
        Some(code)
    }

    fn complete_type(&mut self) -> Result<(), SignatureError> {
        let at = self.pos;
        let code = self.next().ok_or(SignatureError::UnexpectedEnd)?;
        match code {
            c if is_basic(c) => Ok(()),
            b'v' => Ok(()),
            b'a' => {
                self.array_depth += 1;
                if self.array_depth > MAX_ARRAY_DEPTH {
                    return Err(SignatureError::ArrayTooDeep);
                }
                if self.peek() == Some(b'{') {
                    self.pos += 1;
                    self.dict_entry(self.pos - 1)?;
                } else {
                    self.complete_type()?;
                }
                self.array_depth -= 1;
                Ok(())
            }
            b'(' => {
                self.enter_struct()?;
                if self.peek() == Some(b')') {
                    return Err(SignatureError::EmptyStruct(at));
                }
                loop {
                    match self.peek() {
                        Some(b')') => break,
                        Some(_) => self.complete_type()?,
                        None => return Err(SignatureError::UnexpectedEnd),
                    }
                }
                self.pos += 1;
                self.struct_depth -= 1;
                Ok(())
            }
            b'{' => Err(SignatureError::DictOutsideArray(at)),
            b')' | b'}' => Err(SignatureError::UnbalancedClose(code as char, at)),
            other => Err(SignatureError::InvalidCode(other as char, at)),
        }
    }

    fn dict_entry(&mut self, start: usize) -> Result<(), SignatureError> {
        self.enter_struct()?;
        let key_at = self.pos;
        let key = self.next().ok_or(SignatureError::UnexpectedEnd)?;
        if !is_basic(key) {
            return Err(SignatureError::DictKeyNotBasic(key_at));
        }
        if self.peek() == Some(b'}') {
            return Err(SignatureError::BadDictEntry(start));
        }
        self.complete_type()?;
        match self.next() {
            Some(b'}') => {
                self.struct_depth -= 1;
                Ok(())
            }
            Some(_) => Err(SignatureError::BadDictEntry(start)),
            None => Err(SignatureError::UnexpectedEnd),
        }
    }

    fn enter_struct(&mut self) -> Result<(), SignatureError> {
        self.struct_depth += 1;
        if self.struct_depth > MAX_STRUCT_DEPTH {
            return Err(SignatureError::StructTooDeep);
        }
        Ok(())
    }
}
