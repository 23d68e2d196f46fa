use rustc_hash::FxHashMap;

use crate::{
    ast::{BinaryOperator, Expression, Function, Literal, MatchMode, Program},
    bytecode::{Accessor, Code, Instruction, AX},
    linker::Linker,
    semantic::{SemanticError, SymbolTable},
    vm::StackEntry,
};

pub fn compile(program: &Program) -> Result<Code, SemanticError> {
    Compiler::new().compile(program)
}

/// Lowers a [`Program`] to stack machine code.
///
/// `offset` mirrors the runtime distance between the frame base and the top of
/// the stack at the point being generated. Every lowering leaves it where it
/// found it, so slots captured before a nested expression stay valid after it.
#[derive(Debug, Default)]
pub struct Compiler {
    code: Code,
    linker: Linker,
    symbols: SymbolTable,
    slots: FxHashMap<usize, isize>,
    offset: isize,
    next_heap: usize,
}

impl Compiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn compile(&mut self, program: &Program) -> Result<Code, SemanticError> {
        for function in &program.functions {
            self.symbols
                .register_function(&function.name, function.params.len())?;
        }

        self.expression(&program.body)?;
        self.code.emit(Instruction::Exit(AX));

        for function in &program.functions {
            self.function(function)?;
        }
        self.linker.link(&mut self.code)?;

        tracing::debug!(
            functions = program.functions.len(),
            instructions = self.code.len(),
            "generated code"
        );
        Ok(std::mem::take(&mut self.code))
    }

    fn function(&mut self, function: &Function) -> Result<(), SemanticError> {
        let start = self.code.len();
        self.linker.bind(&function.name, start);
        self.code.label(start, &function.name);

        // The caller leaves the arguments directly below the new frame base.
        let arity = function.params.len() as isize;
        self.offset = 0;
        let ids = self.symbols.push_scope(&function.params)?;
        for (index, id) in ids.into_iter().enumerate() {
            self.slots.insert(id, index as isize - arity);
        }

        self.expression(&function.body)?;
        self.symbols.pop_scope();
        self.code.emit(Instruction::Result(AX));
        Ok(())
    }

    fn expression(&mut self, expr: &Expression) -> Result<(), SemanticError> {
        match expr {
            Expression::Data(literal) => {
                let value = match literal {
                    Literal::Number(n) => StackEntry::Number(*n),
                    Literal::String(s) => StackEntry::String(s.clone()),
                };
                self.code
                    .emit(Instruction::Mov(AX, Accessor::Constant(value)));
            }
            Expression::Variable(name) => {
                let slot = self.variable(name)?;
                self.code.emit(Instruction::Mov(AX, Accessor::Stack(slot)));
            }
            Expression::Assign { name, value } => {
                let slot = self.variable(name)?;
                self.expression(value)?;
                self.code.emit(Instruction::Mov(Accessor::Stack(slot), AX));
            }
            Expression::Not(expr) => {
                self.expression(expr)?;
                self.code.emit(Instruction::Not(AX));
            }
            Expression::Binary(left, op, right) => self.binary(left, *op, right)?,
            Expression::Let {
                names,
                values,
                body,
            } => self.let_binding(names, values, body)?,
            Expression::Concat(parts) => self.concat(parts)?,
            Expression::Match {
                conditions,
                branches,
                mode,
            } => self.match_expr(conditions, branches, *mode)?,
            Expression::Repeat { condition, body } => self.repeat(condition, body)?,
            Expression::Call { name, args } => self.call(name, args)?,
        }
        Ok(())
    }

    fn binary(
        &mut self,
        left: &Expression,
        op: BinaryOperator,
        right: &Expression,
    ) -> Result<(), SemanticError> {
        let target = match (op.compound_base(), left) {
            (None, _) => None,
            (Some(_), Expression::Variable(name)) => Some(self.variable(name)?),
            (Some(_), _) => return Err(SemanticError::InvalidAssignTarget(op.to_string())),
        };

        self.expression(left)?;
        let lhs = self.push(AX);
        self.expression(right)?;
        let rhs = self.push(AX);

        let instruction: fn(Accessor, Accessor) -> Instruction = match op {
            BinaryOperator::Add | BinaryOperator::AddAssign => Instruction::Add,
            BinaryOperator::Subtract | BinaryOperator::SubtractAssign => Instruction::Sub,
            BinaryOperator::Multiply | BinaryOperator::MultiplyAssign => Instruction::Mul,
            BinaryOperator::Divide | BinaryOperator::DivideAssign => Instruction::Div,
            BinaryOperator::Modulo | BinaryOperator::ModuloAssign => Instruction::Mod,
            BinaryOperator::Less => Instruction::Less,
            BinaryOperator::LessEqual => Instruction::LessEqual,
            BinaryOperator::Greater => Instruction::Greater,
            BinaryOperator::GreaterEqual => Instruction::GreaterEqual,
            BinaryOperator::Equal => Instruction::Equal,
            BinaryOperator::NotEqual => Instruction::NotEqual,
            BinaryOperator::And => Instruction::And,
            BinaryOperator::Or => Instruction::Or,
        };
        self.code
            .emit(instruction(Accessor::Stack(lhs), Accessor::Stack(rhs)));
        self.code.emit(Instruction::Mov(AX, Accessor::Stack(lhs)));
        if let Some(slot) = target {
            self.code.emit(Instruction::Mov(Accessor::Stack(slot), AX));
        }
        self.drop(2);
        Ok(())
    }

    fn let_binding(
        &mut self,
        names: &[String],
        values: &[Expression],
        body: &Expression,
    ) -> Result<(), SemanticError> {
        // Values are evaluated before the new names are visible.
        let mut slots = Vec::with_capacity(values.len());
        for value in values {
            self.expression(value)?;
            slots.push(self.push(AX));
        }

        let ids = self.symbols.push_scope(names)?;
        self.slots.extend(ids.into_iter().zip(slots));
        self.expression(body)?;
        self.symbols.pop_scope();

        self.drop(values.len());
        Ok(())
    }

    fn concat(&mut self, parts: &[Expression]) -> Result<(), SemanticError> {
        let mut slots = Vec::with_capacity(parts.len());
        for part in parts {
            self.expression(part)?;
            slots.push(self.push(AX));
        }

        let buffer = self.next_heap;
        self.next_heap += 1;
        self.code.emit(Instruction::New(buffer));
        self.code
            .emit(Instruction::Mov(Accessor::Heap(buffer), Accessor::string("")));
        for slot in slots {
            self.code.emit(Instruction::Concat(
                Accessor::Heap(buffer),
                Accessor::Stack(slot),
            ));
        }
        self.code
            .emit(Instruction::Mov(AX, Accessor::Heap(buffer)));
        self.code.emit(Instruction::Release(buffer));

        self.drop(parts.len());
        Ok(())
    }

    fn match_expr(
        &mut self,
        conditions: &[Expression],
        branches: &[Expression],
        mode: MatchMode,
    ) -> Result<(), SemanticError> {
        let result = self.push(Accessor::number(0.0));
        let mut exits = Vec::new();

        for (condition, branch) in conditions.iter().zip(branches) {
            self.expression(condition)?;
            let skip = self.code.emit(Instruction::JumpUnless(AX, 0));
            self.expression(branch)?;
            self.code
                .emit(Instruction::Mov(Accessor::Stack(result), AX));
            if mode == MatchMode::First {
                exits.push(self.code.emit(Instruction::Goto(0)));
            }
            self.patch_here(skip);
        }
        for exit in exits {
            self.patch_here(exit);
        }

        self.code
            .emit(Instruction::Mov(AX, Accessor::Stack(result)));
        self.drop(1);
        Ok(())
    }

    fn repeat(&mut self, condition: &Expression, body: &Expression) -> Result<(), SemanticError> {
        let result = self.push(Accessor::number(0.0));

        let top = self.code.len();
        self.expression(condition)?;
        let exit = self.code.emit(Instruction::JumpUnless(AX, 0));
        self.expression(body)?;
        self.code
            .emit(Instruction::Mov(Accessor::Stack(result), AX));
        self.code.emit(Instruction::Goto(top));
        self.patch_here(exit);

        self.code
            .emit(Instruction::Mov(AX, Accessor::Stack(result)));
        self.drop(1);
        Ok(())
    }

    fn call(&mut self, name: &str, args: &[Expression]) -> Result<(), SemanticError> {
        match self.symbols.function_arity(name) {
            None => return Err(SemanticError::UnknownFunction(name.to_string())),
            Some(arity) if arity != args.len() => {
                return Err(SemanticError::ArityMismatch {
                    name: name.to_string(),
                    expected: arity,
                    found: args.len(),
                })
            }
            Some(_) => {}
        }

        let mut slots = Vec::with_capacity(args.len());
        for arg in args {
            self.expression(arg)?;
            slots.push(self.push(AX));
        }
        // Second copy forms the callee's parameter window.
        for slot in slots {
            self.push(Accessor::Stack(slot));
        }
        self.linker.call(&mut self.code, name);

        self.drop(2 * args.len());
        Ok(())
    }

    fn variable(&self, name: &str) -> Result<isize, SemanticError> {
        self.symbols
            .variable_id(name)
            .and_then(|id| self.slots.get(&id).copied())
            .ok_or_else(|| SemanticError::UndefinedVariable(name.to_string()))
    }

    /// Emits a push and returns the slot the value lands in.
    fn push(&mut self, src: Accessor) -> isize {
        let slot = self.offset;
        self.code.emit(Instruction::Push(src));
        self.offset += 1;
        slot
    }

    fn drop(&mut self, n: usize) {
        if n > 0 {
            self.code.emit(Instruction::Drop(n));
            self.offset -= n as isize;
        }
    }

    fn patch_here(&mut self, address: usize) {
        let target = self.code.len();
        self.code.patch(address, target);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parser, tokenizer::tokenize};

    fn generate(source: &str) -> Result<Code, SemanticError> {
        compile(&parser::program(&tokenize(source).unwrap()).unwrap())
    }

    /// Replays pushes and drops along straight-line code.
    fn net_stack_effect(code: &[Instruction]) -> isize {
        code.iter()
            .map(|instruction| match instruction {
                Instruction::Push(_) => 1,
                Instruction::Pop(_) => -1,
                Instruction::Drop(n) => -(*n as isize),
                _ => 0,
            })
            .sum()
    }

    #[test]
    fn test_function_arity_is_registered() {
        let program = parser::program(&tokenize("~add(x y)(x + y) add{3 4}").unwrap()).unwrap();
        let mut compiler = Compiler::new();
        compiler.compile(&program).unwrap();
        assert_eq!(compiler.symbols().function_arity("add"), Some(2));
    }

    #[test]
    fn test_call_layout() {
        let code = generate("~add(x y)(x + y) add{3 4}").unwrap();
        let expected = vec![
            Instruction::Mov(AX, Accessor::number(3.0)),
            Instruction::Push(AX),
            Instruction::Mov(AX, Accessor::number(4.0)),
            Instruction::Push(AX),
            Instruction::Push(Accessor::Stack(0)),
            Instruction::Push(Accessor::Stack(1)),
            Instruction::Call(9),
            Instruction::Drop(4),
            Instruction::Exit(AX),
            Instruction::Mov(AX, Accessor::Stack(-2)),
            Instruction::Push(AX),
            Instruction::Mov(AX, Accessor::Stack(-1)),
            Instruction::Push(AX),
            Instruction::Add(Accessor::Stack(0), Accessor::Stack(1)),
            Instruction::Mov(AX, Accessor::Stack(0)),
            Instruction::Drop(2),
            Instruction::Result(AX),
        ];
        assert_eq!(code.instructions(), expected.as_slice());
    }

    #[test]
    fn test_mutual_recursion_links() {
        let code = generate(
            "~even(n)(|((== n 0) 1 1 odd{(n - 1)})) \
             ~odd(n)(|((== n 0) 0 1 even{(n - 1)})) \
             even{4}",
        )
        .unwrap();

        let calls: Vec<usize> = code
            .instructions()
            .iter()
            .filter_map(|instruction| match instruction {
                Instruction::Call(target) => Some(*target),
                _ => None,
            })
            .collect();
        assert_eq!(calls.len(), 3);
        for target in calls {
            assert!(target < code.len());
            assert!(target > 0);
        }
    }

    #[test]
    fn test_undefined_variable() {
        assert_eq!(
            generate("+ x 1"),
            Err(SemanticError::UndefinedVariable("x".to_string()))
        );
    }

    #[test]
    fn test_function_scope_is_closed() {
        assert_eq!(
            generate("~f(x)(x) x"),
            Err(SemanticError::UndefinedVariable("x".to_string()))
        );
        assert_eq!(
            generate("~f(x)(g{}) ~g()(x) f{1}"),
            Err(SemanticError::UndefinedVariable("x".to_string()))
        );
    }

    #[test]
    fn test_arity_mismatch() {
        assert_eq!(
            generate("~add(x y)(x + y) add{3}"),
            Err(SemanticError::ArityMismatch {
                name: "add".to_string(),
                expected: 2,
                found: 1,
            })
        );
        assert!(generate("nope{}")
            .unwrap_err()
            .to_string()
            .starts_with("Function not found"));
    }

    #[test]
    fn test_compound_assignment_needs_variable() {
        assert_eq!(
            generate("+= 1 2"),
            Err(SemanticError::InvalidAssignTarget("+=".to_string()))
        );
    }

    #[test]
    fn test_redeclared_function() {
        assert_eq!(
            generate("~f()(1) ~f()(2) f{}"),
            Err(SemanticError::FunctionRedeclared("f".to_string()))
        );
    }

    #[test]
    fn test_main_block_is_stack_neutral() {
        let code = generate(":(a b)(1 2) .(a @((< a b) 'x' 1 (: b 5)) (^ (< a 3) ++a))").unwrap();
        let exit = code
            .instructions()
            .iter()
            .position(|instruction| matches!(instruction, Instruction::Exit(_)))
            .unwrap();
        assert_eq!(net_stack_effect(&code.instructions()[..exit]), 0);
    }

    #[test]
    fn test_first_match_jumps_to_end() {
        let code = generate("|(1 2 0 3)").unwrap();
        let end = code.len() - 3;
        let gotos: Vec<&Instruction> = code
            .instructions()
            .iter()
            .filter(|instruction| matches!(instruction, Instruction::Goto(_)))
            .collect();
        assert_eq!(gotos, vec![&Instruction::Goto(end), &Instruction::Goto(end)]);
    }
}
