//! Bytecode assembler for method bodies.
//!
//! Tracks the current offset so line numbers and branch padding line up
//! with what the parser expects.

use crate::internal;
use crate::pool::{ConstantPool, REF_INVOKE_STATIC};

const LAMBDA_METAFACTORY: &str = "java/lang/invoke/LambdaMetafactory";
const METAFACTORY_DESCRIPTOR: &str = "(Ljava/lang/invoke/MethodHandles$Lookup;Ljava/lang/String;\
Ljava/lang/invoke/MethodType;Ljava/lang/invoke/MethodType;Ljava/lang/invoke/MethodHandle;\
Ljava/lang/invoke/MethodType;)Ljava/lang/invoke/CallSite;";

/// One `BootstrapMethods` entry: method handle plus arguments.
pub(crate) type Bootstrap = (u16, Vec<u16>);

/// A finished `Code` attribute body.
#[derive(Debug, Clone)]
pub(crate) struct Code {
    pub bytes: Vec<u8>,
    pub lines: Vec<(u16, u16)>,
    pub catches: Vec<[u16; 4]>,
}

/// Emits bytecode for one method body.
///
/// Instructions are not verified; only the encoding is exact. All class
/// names are dotted binary names.
pub struct CodeBuilder<'p> {
    pool: &'p mut ConstantPool,
    bootstrap: &'p mut Vec<Bootstrap>,
    bytes: Vec<u8>,
    lines: Vec<(u16, u16)>,
    catches: Vec<[u16; 4]>,
}

impl<'p> CodeBuilder<'p> {
    pub(crate) fn new(pool: &'p mut ConstantPool, bootstrap: &'p mut Vec<Bootstrap>) -> Self {
        Self {
            pool,
            bootstrap,
            bytes: Vec::new(),
            lines: Vec::new(),
            catches: Vec::new(),
        }
    }

    pub(crate) fn finish(self) -> Code {
        Code {
            bytes: self.bytes,
            lines: self.lines,
            catches: self.catches,
        }
    }

    /// Current bytecode offset.
    #[must_use]
    pub fn pc(&self) -> u16 {
        u16::try_from(self.bytes.len()).unwrap_or(u16::MAX)
    }

    fn op(&mut self, opcode: u8) -> &mut Self {
        self.bytes.push(opcode);
        self
    }

    fn op_u2(&mut self, opcode: u8, operand: u16) -> &mut Self {
        self.bytes.push(opcode);
        self.bytes.extend_from_slice(&operand.to_be_bytes());
        self
    }

    fn i4(&mut self, value: i32) {
        self.bytes.extend_from_slice(&value.to_be_bytes());
    }

    /// Starts a `LineNumberTable` entry at the current offset.
    pub fn line(&mut self, line: u16) -> &mut Self {
        let pc = self.pc();
        self.lines.push((pc, line));
        self
    }

    /// `nop`
    pub fn nop(&mut self) -> &mut Self {
        self.op(0x00)
    }

    /// `aconst_null`
    pub fn aconst_null(&mut self) -> &mut Self {
        self.op(0x01)
    }

    /// Shortest integer push: `iconst_*`, `bipush` or `sipush`.
    pub fn iconst(&mut self, value: i16) -> &mut Self {
        match value {
            -1..=5 => self.op(u8::try_from(value + 3).unwrap_or(0)),
            -128..=127 => {
                self.op(0x10);
                self.bytes.extend_from_slice(&value.to_be_bytes()[1..]);
                self
            }
            _ => self.op_u2(0x11, u16::from_be_bytes(value.to_be_bytes())),
        }
    }

    /// `lconst_0`
    pub fn lconst_0(&mut self) -> &mut Self {
        self.op(0x09)
    }

    /// `ldc`/`ldc_w` of a string constant.
    pub fn ldc_string(&mut self, text: &str) -> &mut Self {
        let index = self.pool.string(text);
        self.ldc(index)
    }

    /// `ldc`/`ldc_w` of a class literal.
    pub fn ldc_class(&mut self, class: &str) -> &mut Self {
        let index = self.pool.class(&internal(class));
        self.ldc(index)
    }

    /// `ldc_w` of a class literal, even for small indexes.
    pub fn ldc_w_class(&mut self, class: &str) -> &mut Self {
        let index = self.pool.class(&internal(class));
        self.op_u2(0x13, index)
    }

    /// `ldc` of a `MethodType` constant.
    pub fn ldc_method_type(&mut self, descriptor: &str) -> &mut Self {
        let index = self.pool.method_type(descriptor);
        self.ldc(index)
    }

    /// `ldc2_w` of a long constant.
    pub fn ldc2_long(&mut self, value: i64) -> &mut Self {
        let index = self.pool.long(value);
        self.op_u2(0x14, index)
    }

    fn ldc(&mut self, index: u16) -> &mut Self {
        match u8::try_from(index) {
            Ok(small) => {
                self.bytes.extend_from_slice(&[0x12, small]);
                self
            }
            Err(_) => self.op_u2(0x13, index),
        }
    }

    /// `iload`
    pub fn iload(&mut self, slot: u8) -> &mut Self {
        self.bytes.extend_from_slice(&[0x15, slot]);
        self
    }

    /// `aload`
    pub fn aload(&mut self, slot: u8) -> &mut Self {
        self.bytes.extend_from_slice(&[0x19, slot]);
        self
    }

    /// `astore`
    pub fn astore(&mut self, slot: u8) -> &mut Self {
        self.bytes.extend_from_slice(&[0x3a, slot]);
        self
    }

    /// `wide iload` with a 16-bit slot.
    pub fn wide_iload(&mut self, slot: u16) -> &mut Self {
        self.bytes.extend_from_slice(&[0xc4, 0x15]);
        self.bytes.extend_from_slice(&slot.to_be_bytes());
        self
    }

    /// `wide iinc` with 16-bit slot and increment.
    pub fn wide_iinc(&mut self, slot: u16, delta: i16) -> &mut Self {
        self.bytes.extend_from_slice(&[0xc4, 0x84]);
        self.bytes.extend_from_slice(&slot.to_be_bytes());
        self.bytes.extend_from_slice(&delta.to_be_bytes());
        self
    }

    /// `pop`
    pub fn pop(&mut self) -> &mut Self {
        self.op(0x57)
    }

    /// `dup`
    pub fn dup(&mut self) -> &mut Self {
        self.op(0x59)
    }

    /// `goto` with a relative offset.
    pub fn goto(&mut self, offset: i16) -> &mut Self {
        self.op_u2(0xa7, u16::from_be_bytes(offset.to_be_bytes()))
    }

    /// `tableswitch` over `low..=high`, every target at the switch itself.
    pub fn tableswitch(&mut self, low: i32, high: i32) -> &mut Self {
        self.op(0xaa);
        self.pad_switch();
        self.i4(0);
        self.i4(low);
        self.i4(high);
        for _ in low..=high {
            self.i4(0);
        }
        self
    }

    /// `lookupswitch` over `keys`, every target at the switch itself.
    pub fn lookupswitch(&mut self, keys: &[i32]) -> &mut Self {
        self.op(0xab);
        self.pad_switch();
        self.i4(0);
        self.i4(i32::try_from(keys.len()).unwrap_or(i32::MAX));
        for key in keys {
            self.i4(*key);
            self.i4(0);
        }
        self
    }

    fn pad_switch(&mut self) {
        while self.bytes.len() % 4 != 0 {
            self.bytes.push(0);
        }
    }

    /// `ireturn`
    pub fn ireturn(&mut self) -> &mut Self {
        self.op(0xac)
    }

    /// `lreturn`
    pub fn lreturn(&mut self) -> &mut Self {
        self.op(0xad)
    }

    /// `areturn`
    pub fn areturn(&mut self) -> &mut Self {
        self.op(0xb0)
    }

    /// `return`
    pub fn return_void(&mut self) -> &mut Self {
        self.op(0xb1)
    }

    /// `athrow`
    pub fn athrow(&mut self) -> &mut Self {
        self.op(0xbf)
    }

    /// `getstatic`
    pub fn getstatic(&mut self, owner: &str, name: &str, descriptor: &str) -> &mut Self {
        let index = self.pool.field_ref(&internal(owner), name, descriptor);
        self.op_u2(0xb2, index)
    }

    /// `putstatic`
    pub fn putstatic(&mut self, owner: &str, name: &str, descriptor: &str) -> &mut Self {
        let index = self.pool.field_ref(&internal(owner), name, descriptor);
        self.op_u2(0xb3, index)
    }

    /// `getfield`
    pub fn getfield(&mut self, owner: &str, name: &str, descriptor: &str) -> &mut Self {
        let index = self.pool.field_ref(&internal(owner), name, descriptor);
        self.op_u2(0xb4, index)
    }

    /// `putfield`
    pub fn putfield(&mut self, owner: &str, name: &str, descriptor: &str) -> &mut Self {
        let index = self.pool.field_ref(&internal(owner), name, descriptor);
        self.op_u2(0xb5, index)
    }

    /// `invokevirtual`
    pub fn invokevirtual(&mut self, owner: &str, name: &str, descriptor: &str) -> &mut Self {
        let index = self.pool.method_ref(&internal(owner), name, descriptor);
        self.op_u2(0xb6, index)
    }

    /// `invokevirtual` on an array type such as `[Ljava/lang/String;`.
    pub fn invokevirtual_array(&mut self, array: &str, name: &str, descriptor: &str) -> &mut Self {
        let index = self.pool.method_ref(array, name, descriptor);
        self.op_u2(0xb6, index)
    }

    /// `invokespecial`
    pub fn invokespecial(&mut self, owner: &str, name: &str, descriptor: &str) -> &mut Self {
        let index = self.pool.method_ref(&internal(owner), name, descriptor);
        self.op_u2(0xb7, index)
    }

    /// `invokestatic`
    pub fn invokestatic(&mut self, owner: &str, name: &str, descriptor: &str) -> &mut Self {
        let index = self.pool.method_ref(&internal(owner), name, descriptor);
        self.op_u2(0xb8, index)
    }

    /// `invokeinterface`
    pub fn invokeinterface(&mut self, owner: &str, name: &str, descriptor: &str) -> &mut Self {
        let index = self
            .pool
            .interface_method_ref(&internal(owner), name, descriptor);
        self.op_u2(0xb9, index);
        self.bytes.extend_from_slice(&[1, 0]);
        self
    }

    /// `invokedynamic` through `LambdaMetafactory.metafactory` producing a
    /// `Runnable` bound to the static method `owner.name descriptor`, as
    /// `Owner::name` compiles.
    pub fn method_reference(&mut self, owner: &str, name: &str, descriptor: &str) -> &mut Self {
        let factory = self
            .pool
            .method_ref(LAMBDA_METAFACTORY, "metafactory", METAFACTORY_DESCRIPTOR);
        let factory = self.pool.method_handle(REF_INVOKE_STATIC, factory);
        let target = self.pool.method_ref(&internal(owner), name, descriptor);
        let target = self.pool.method_handle(REF_INVOKE_STATIC, target);
        let erased = self.pool.method_type("()V");
        let instantiated = self.pool.method_type("()V");

        let bootstrap = u16::try_from(self.bootstrap.len()).unwrap_or(u16::MAX);
        self.bootstrap
            .push((factory, vec![erased, target, instantiated]));
        let index = self
            .pool
            .invoke_dynamic(bootstrap, "run", "()Ljava/lang/Runnable;");
        self.op_u2(0xba, index);
        self.bytes.extend_from_slice(&[0, 0]);
        self
    }

    /// `new`
    pub fn new_object(&mut self, class: &str) -> &mut Self {
        let index = self.pool.class(&internal(class));
        self.op_u2(0xbb, index)
    }

    /// `newarray` of a primitive type code (10 = int).
    pub fn newarray(&mut self, atype: u8) -> &mut Self {
        self.bytes.extend_from_slice(&[0xbc, atype]);
        self
    }

    /// `anewarray`
    pub fn anewarray(&mut self, class: &str) -> &mut Self {
        let index = self.pool.class(&internal(class));
        self.op_u2(0xbd, index)
    }

    /// `checkcast`
    pub fn checkcast(&mut self, class: &str) -> &mut Self {
        let index = self.pool.class(&internal(class));
        self.op_u2(0xc0, index)
    }

    /// `instanceof`
    pub fn instanceof(&mut self, class: &str) -> &mut Self {
        let index = self.pool.class(&internal(class));
        self.op_u2(0xc1, index)
    }

    /// `multianewarray` of an array descriptor such as `[[Ljava/lang/String;`.
    pub fn multianewarray(&mut self, descriptor: &str, dims: u8) -> &mut Self {
        let index = self.pool.class(descriptor);
        self.op_u2(0xc5, index);
        self.bytes.push(dims);
        self
    }

    /// Adds an exception-table entry covering everything emitted so far,
    /// with the handler at the current offset.
    pub fn catch_here(&mut self, class: &str) -> &mut Self {
        let handler = self.pc();
        let catch_type = self.pool.class(&internal(class));
        self.catches.push([0, handler, handler, catch_type]);
        self
    }
}
