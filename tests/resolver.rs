mod common;

#[cfg(test)]
mod resolver_tests {
    use super::common::{errors_of, messages};

    use rox::ast::{Expr, Stmt};
    use rox::error::Diagnostics;
    use rox::parser::Parser;
    use rox::resolver::{Locals, Resolver};
    use rox::scanner::Scanner;

    fn resolve(source: &str) -> (Vec<Stmt>, Result<Locals, Diagnostics>) {
        let tokens = Scanner::new(source).scan_tokens().unwrap();
        let statements = Parser::new(&tokens).parse().unwrap();
        let locals = Resolver::new().resolve(&statements);
        (statements, locals)
    }

    fn static_errors(source: &str) -> Vec<String> {
        let (_, result) = resolve(source);
        result
            .unwrap_err()
            .iter()
            .map(|e| e.to_string())
            .collect()
    }

    #[test]
    fn test_resolver_01_globals_are_left_unresolved() {
        let (statements, locals) = resolve("var a = 1; print a;");
        let locals = locals.unwrap();

        match &statements[1] {
            Stmt::Print(Expr::Variable(var)) => assert!(!locals.contains_key(&var.id)),
            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn test_resolver_02_hop_counts_match_nesting() {
        let (statements, locals) = resolve("{ var a = 1; { { print a; } } }");
        let locals = locals.unwrap();

        // block → block → block → print a
        let Stmt::Block(outer) = &statements[0] else {
            panic!("expected block")
        };
        let Stmt::Block(middle) = &outer[1] else {
            panic!("expected block")
        };
        let Stmt::Block(inner) = &middle[0] else {
            panic!("expected block")
        };
        let Stmt::Print(Expr::Variable(var)) = &inner[0] else {
            panic!("expected print")
        };

        assert_eq!(locals.get(&var.id), Some(&2));
    }

    #[test]
    fn test_resolver_03_self_reference_in_initializer() {
        assert_eq!(
            static_errors("{ var a = a; }"),
            vec!["[line 1] Error at 'a': Can't read local variable in its own initializer."]
        );

        assert_eq!(
            static_errors("var a = a;"),
            vec!["[line 1] Error at 'a': Can't read local variable in its own initializer."]
        );

        // Only the variable being declared is off limits.
        let (_, result) = resolve("var b = 1; var a = b; var c = a + b;");
        assert!(result.is_ok());
    }

    #[test]
    fn test_resolver_04_redeclaration_in_same_scope() {
        assert_eq!(
            static_errors("fun f() { var a = 1;\nvar a = 2; }"),
            vec!["[line 2] Error at 'a': Already a variable with this name in this scope."]
        );

        let (_, result) = resolve("var a = 1; var a = 2;");
        assert!(result.is_ok());
    }

    #[test]
    fn test_resolver_05_misplaced_keywords() {
        assert_eq!(
            static_errors("return 1;"),
            vec!["[line 1] Error at 'return': Can't return from top-level code."]
        );
        assert_eq!(
            static_errors("print this;"),
            vec!["[line 1] Error at 'this': Can't use 'this' outside of a class."]
        );
        assert_eq!(
            static_errors("fun f() { super.go(); }"),
            vec!["[line 1] Error at 'super': Can't use 'super' outside of a class."]
        );
        assert_eq!(
            static_errors("class A { go() { super.go(); } }"),
            vec!["[line 1] Error at 'super': Can't use 'super' in a class with no superclass."]
        );
        assert_eq!(
            static_errors("class A { init() { return 1; } }"),
            vec!["[line 1] Error at 'return': Can't return a value from an initializer."]
        );
    }

    #[test]
    fn test_resolver_06_bare_return_in_initializer_is_fine() {
        let (_, result) = resolve("class A { init() { return; } }");
        assert!(result.is_ok());
    }

    #[test]
    fn test_resolver_07_class_cannot_inherit_from_itself() {
        assert_eq!(
            static_errors("class A < A {}"),
            vec!["[line 1] Error at 'A': A class can't inherit from itself."]
        );
    }

    #[test]
    fn test_resolver_08_loop_control_outside_loop() {
        assert_eq!(
            static_errors("break;"),
            vec!["[line 1] Error at 'break': Can't use 'break' outside of a loop."]
        );

        // A function body does not see the loop around it.
        assert_eq!(
            static_errors("while (true) { fun f() { continue; } }"),
            vec!["[line 1] Error at 'continue': Can't use 'continue' outside of a loop."]
        );

        let (_, result) = resolve("for (;;) { if (true) break; else continue; }");
        assert!(result.is_ok());
    }

    #[test]
    fn test_resolver_09_all_errors_reported() {
        let diagnostics = errors_of("return;\nprint this;\nbreak;");

        assert_eq!(
            messages(&diagnostics),
            vec![
                "Can't return from top-level code.",
                "Can't use 'this' outside of a class.",
                "Can't use 'break' outside of a loop.",
            ]
        );
        assert_eq!(diagnostics.exit_code(), 65);
    }

    fn depth_of_last_print(source: &str) -> Option<usize> {
        let (statements, locals) = resolve(source);
        let locals = locals.unwrap();

        let Stmt::Block(body) = &statements[0] else {
            panic!("expected block")
        };
        match body.last() {
            Some(Stmt::Print(Expr::Variable(var))) => locals.get(&var.id).copied(),
            other => panic!("expected print, got {:?}", other),
        }
    }

    #[test]
    fn test_resolver_10_sibling_statements_leave_hops_unchanged() {
        let bare = depth_of_last_print("{ var x = 1; { print x; } print x; }");
        let padded = depth_of_last_print(
            "{ var x = 1; var y = 2; { print x; } fun f() { return y; } if (y) print y; print x; }",
        );

        assert_eq!(bare, Some(0));
        assert_eq!(bare, padded);
    }
}
