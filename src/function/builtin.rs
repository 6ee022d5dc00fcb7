//! Built-in scalar functions.
//!
//! All of them pass the `NULL` sentinel through unchanged, except `concat`
//! which joins its arguments verbatim.

use super::{check_arity, Function, FunctionError, FunctionRegistry, FunctionResult};
use aes::{Aes128, Aes192, Aes256};
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockEncryptMut, KeyIvInit};
use regex::Regex;
use std::borrow::Cow;

const NULL: &str = "NULL";

/// Register every built-in function in `registry`
pub fn register_builtins(registry: &FunctionRegistry) {
    registry.register("lower", || Box::new(Lower));
    registry.register("upper", || Box::new(Upper));
    registry.register("length", || Box::new(Length));
    registry.register("concat", || Box::new(Concat));
    registry.register("regexp_extract", || Box::new(RegexpExtract::default()));
    registry.register("aes_encrypt", || Box::new(AesEncrypt::default()));
}

/// lower(s)
pub struct Lower;

impl Function for Lower {
    fn init(&mut self, params: &[String]) -> FunctionResult<()> {
        check_arity(self.name(), params, 1, Some(1))
    }

    fn process(&self, params: &[String]) -> FunctionResult<String> {
        check_arity(self.name(), params, 1, Some(1))?;
        if params[0] == NULL {
            return Ok(NULL.to_string());
        }
        Ok(params[0].to_lowercase())
    }

    fn name(&self) -> &str {
        "lower"
    }
}

/// upper(s)
pub struct Upper;

impl Function for Upper {
    fn init(&mut self, params: &[String]) -> FunctionResult<()> {
        check_arity(self.name(), params, 1, Some(1))
    }

    fn process(&self, params: &[String]) -> FunctionResult<String> {
        check_arity(self.name(), params, 1, Some(1))?;
        if params[0] == NULL {
            return Ok(NULL.to_string());
        }
        Ok(params[0].to_uppercase())
    }

    fn name(&self) -> &str {
        "upper"
    }
}

/// length(s), counted in characters
pub struct Length;

impl Function for Length {
    fn init(&mut self, params: &[String]) -> FunctionResult<()> {
        check_arity(self.name(), params, 1, Some(1))
    }

    fn process(&self, params: &[String]) -> FunctionResult<String> {
        check_arity(self.name(), params, 1, Some(1))?;
        if params[0] == NULL {
            return Ok(NULL.to_string());
        }
        Ok(params[0].chars().count().to_string())
    }

    fn name(&self) -> &str {
        "length"
    }
}

/// concat(s, ...)
pub struct Concat;

impl Function for Concat {
    fn init(&mut self, params: &[String]) -> FunctionResult<()> {
        check_arity(self.name(), params, 1, None)
    }

    fn process(&self, params: &[String]) -> FunctionResult<String> {
        check_arity(self.name(), params, 1, None)?;
        Ok(params.concat())
    }

    fn name(&self) -> &str {
        "concat"
    }
}

/// regexp_extract(s, pattern[, group])
///
/// The pattern is compiled from the call text at bind time, so a malformed
/// literal pattern fails planning. When the evaluated pattern differs from the
/// bound text (a column argument) it is compiled per call instead. The group
/// index must be a literal. An input with no match yields the empty string.
#[derive(Default)]
pub struct RegexpExtract {
    pattern: Option<Regex>,
    group: usize,
}

impl Function for RegexpExtract {
    fn init(&mut self, params: &[String]) -> FunctionResult<()> {
        check_arity(self.name(), params, 2, Some(3))?;

        let pattern = Regex::new(&params[1]).map_err(|e| FunctionError::InvalidParameter {
            function: self.name().to_string(),
            message: format!("bad pattern '{}': {}", params[1], e),
        })?;

        let group = match params.get(2) {
            Some(text) => text
                .parse::<usize>()
                .map_err(|_| FunctionError::InvalidParameter {
                    function: self.name().to_string(),
                    message: format!("group index '{}' is not a non-negative integer", text),
                })?,
            None => 0,
        };
        if group >= pattern.captures_len() {
            return Err(FunctionError::InvalidParameter {
                function: self.name().to_string(),
                message: format!(
                    "group {} out of range, pattern has {} groups",
                    group,
                    pattern.captures_len() - 1
                ),
            });
        }

        self.pattern = Some(pattern);
        self.group = group;
        Ok(())
    }

    fn process(&self, params: &[String]) -> FunctionResult<String> {
        check_arity(self.name(), params, 2, Some(3))?;
        let pattern = self.pattern.as_ref().ok_or_else(|| FunctionError::Failed {
            function: self.name().to_string(),
            message: "called before init".to_string(),
        })?;
        if params[0] == NULL || params[1] == NULL {
            return Ok(NULL.to_string());
        }

        let pattern = if pattern.as_str() == params[1] {
            Cow::Borrowed(pattern)
        } else {
            let dynamic = Regex::new(&params[1]).map_err(|e| FunctionError::Failed {
                function: self.name().to_string(),
                message: format!("bad pattern '{}': {}", params[1], e),
            })?;
            Cow::Owned(dynamic)
        };

        let extracted = pattern
            .captures(&params[0])
            .and_then(|caps| caps.get(self.group))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
        Ok(extracted)
    }

    fn name(&self) -> &str {
        "regexp_extract"
    }
}

/// aes_encrypt(s, 'hex key')
///
/// AES-CBC with a zero IV and PKCS#7 padding, hex-encoded. The key is bound at
/// init and must decode to 16, 24 or 32 bytes.
#[derive(Default)]
pub struct AesEncrypt {
    key: Option<Vec<u8>>,
}

impl AesEncrypt {
    const IV: [u8; 16] = [0; 16];

    fn encrypt(&self, key: &[u8], plaintext: &[u8]) -> FunctionResult<Vec<u8>> {
        let ciphertext = match key.len() {
            16 => cbc::Encryptor::<Aes128>::new_from_slices(key, &Self::IV)
                .map(|c| c.encrypt_padded_vec_mut::<Pkcs7>(plaintext)),
            24 => cbc::Encryptor::<Aes192>::new_from_slices(key, &Self::IV)
                .map(|c| c.encrypt_padded_vec_mut::<Pkcs7>(plaintext)),
            32 => cbc::Encryptor::<Aes256>::new_from_slices(key, &Self::IV)
                .map(|c| c.encrypt_padded_vec_mut::<Pkcs7>(plaintext)),
            other => {
                return Err(FunctionError::Failed {
                    function: self.name().to_string(),
                    message: format!("unsupported key size {}", other),
                })
            }
        };
        ciphertext.map_err(|e| FunctionError::Failed {
            function: self.name().to_string(),
            message: e.to_string(),
        })
    }
}

impl Function for AesEncrypt {
    fn init(&mut self, params: &[String]) -> FunctionResult<()> {
        check_arity(self.name(), params, 2, None)?;

        let key = hex::decode(&params[1]).map_err(|e| FunctionError::InvalidParameter {
            function: self.name().to_string(),
            message: format!("key is not hex: {}", e),
        })?;
        if !matches!(key.len(), 16 | 24 | 32) {
            return Err(FunctionError::InvalidParameter {
                function: self.name().to_string(),
                message: format!("key must be 16, 24 or 32 bytes, got {}", key.len()),
            });
        }

        self.key = Some(key);
        Ok(())
    }

    fn process(&self, params: &[String]) -> FunctionResult<String> {
        check_arity(self.name(), params, 2, None)?;
        if params[0] == NULL || params[1] == NULL {
            return Ok(NULL.to_string());
        }
        let key = self.key.as_deref().ok_or_else(|| FunctionError::Failed {
            function: self.name().to_string(),
            message: "called before init".to_string(),
        })?;

        let ciphertext = self.encrypt(key, params[0].as_bytes())?;
        Ok(hex::encode(ciphertext))
    }

    fn name(&self) -> &str {
        "aes_encrypt"
    }
}
