mod common;

#[cfg(test)]
mod interpreter_tests {
    use super::common::{errors_of, messages, output_of, run, session};

    fn runtime_error(source: &str) -> (String, usize) {
        let diagnostics = errors_of(source);
        assert_eq!(diagnostics.exit_code(), 70);
        let err = diagnostics.iter().next().unwrap();
        (err.message(), err.line().unwrap())
    }

    #[test]
    fn test_interpreter_01_arithmetic_and_printing() {
        assert_eq!(
            output_of("print 1 + 2; print 7 / 2; print -(3); print 2 * 3 - 1;"),
            "3\n3.5\n-3\n5\n"
        );
        assert_eq!(output_of("print 1 / 0;"), "inf\n");
    }

    #[test]
    fn test_interpreter_02_truthiness_and_equality() {
        assert_eq!(
            output_of(
                "print !nil; print !0; print !\"\";\n\
                 print nil == false; print 1 == 1; print \"a\" == \"a\"; print 1 != \"1\";"
            ),
            "true\nfalse\nfalse\nfalse\ntrue\ntrue\ntrue\n"
        );
    }

    #[test]
    fn test_interpreter_03_string_concatenation() {
        assert_eq!(
            output_of("print \"val: \" + 3; print 2.5 + \"x\"; print \"a\" + \"b\";"),
            "val: 3\n2.5x\nab\n"
        );
    }

    #[test]
    fn test_interpreter_04_operand_errors() {
        assert_eq!(
            runtime_error("\"3\" - 1;"),
            ("Operands must be numbers.".to_string(), 1)
        );
        assert_eq!(
            runtime_error("print 1;\n-\"x\";"),
            ("Operand must be a number.".to_string(), 2)
        );
        assert_eq!(
            runtime_error("\"a\" < \"b\";"),
            ("Operands must be numbers.".to_string(), 1)
        );
        assert_eq!(runtime_error("nil + 1;").1, 1);
    }

    #[test]
    fn test_interpreter_05_runtime_error_keeps_earlier_output() {
        let (out, result) = run("print \"before\";\nprint nope;\nprint \"after\";");
        let diagnostics = result.unwrap_err();

        assert_eq!(out, "before\n");
        assert_eq!(
            diagnostics.to_string(),
            "Undefined variable 'nope'.\n[line 2]"
        );
    }

    #[test]
    fn test_interpreter_06_logical_operators_return_operands() {
        assert_eq!(
            output_of("print nil or \"yes\"; print 0 and \"second\"; print false and missing;"),
            "yes\nsecond\nfalse\n"
        );
    }

    #[test]
    fn test_interpreter_07_ternary_and_elvis() {
        assert_eq!(
            output_of("print true ? 1 : 2; print nil ?: \"default\"; print 0 ?: \"default\";"),
            "1\ndefault\n0\n"
        );
    }

    #[test]
    fn test_interpreter_08_scoping_and_shadowing() {
        assert_eq!(
            output_of(
                "var a = \"global\";\n\
                 {\n\
                   fun showA() { print a; }\n\
                   showA();\n\
                   var a = \"block\";\n\
                   showA();\n\
                   print a;\n\
                 }\n\
                 print a;"
            ),
            "global\nglobal\nblock\nglobal\n"
        );
    }

    #[test]
    fn test_interpreter_09_closures_keep_their_environment() {
        assert_eq!(
            output_of(
                "fun makeCounter() {\n\
                   var i = 0;\n\
                   fun count() { i = i + 1; print i; }\n\
                   return count;\n\
                 }\n\
                 var counter = makeCounter();\n\
                 counter();\n\
                 counter();\n\
                 var other = makeCounter();\n\
                 other();"
            ),
            "1\n2\n1\n"
        );
    }

    #[test]
    fn test_interpreter_10_recursion() {
        assert_eq!(
            output_of(
                "fun fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); }\n\
                 print fib(15);"
            ),
            "610\n"
        );
    }

    #[test]
    fn test_interpreter_11_loops_break_and_continue() {
        assert_eq!(
            output_of(
                "for (var i = 0; i < 5; i = i + 1) {\n\
                   if (i == 1) continue;\n\
                   if (i == 3) break;\n\
                   print i;\n\
                 }\n\
                 var n = 0;\n\
                 while (true) { n = n + 1; if (n > 2) break; }\n\
                 print n;"
            ),
            "0\n2\n3\n"
        );
    }

    #[test]
    fn test_interpreter_12_return_from_inside_loop() {
        assert_eq!(
            output_of(
                "fun find() { for (var i = 0; ; i = i + 1) { if (i == 4) return i; } }\n\
                 print find();"
            ),
            "4\n"
        );
    }

    #[test]
    fn test_interpreter_13_functions_print_and_default_nil() {
        assert_eq!(
            output_of("fun f() {} print f; print f(); print clock;"),
            "<fn f>\nnil\n<native fn clock>\n"
        );
    }

    #[test]
    fn test_interpreter_14_call_errors() {
        assert_eq!(
            runtime_error("fun f(a) {}\nf();"),
            ("Expected 1 arguments but got 0.".to_string(), 2)
        );
        assert_eq!(
            runtime_error("\"x\"();").0,
            "Can only call functions and classes."
        );
    }

    #[test]
    fn test_interpreter_15_classes_fields_and_methods() {
        assert_eq!(
            output_of(
                "class Box {\n\
                   init(v) { this.v = v; }\n\
                   get() { return this.v; }\n\
                 }\n\
                 var b = Box(1);\n\
                 var g = b.get;\n\
                 b.v = 2;\n\
                 print g();\n\
                 print b;\n\
                 print Box;\n\
                 b.get = \"shadowed\";\n\
                 print b.get;"
            ),
            "2\nBox instance\nBox\nshadowed\n"
        );
    }

    #[test]
    fn test_interpreter_16_initializer_returns_this() {
        assert_eq!(
            output_of(
                "class Foo { init(x) { this.x = x; return; } }\n\
                 var f = Foo(3);\n\
                 print f.x;\n\
                 print f.init(4).x;\n\
                 print f.x;"
            ),
            "3\n4\n4\n"
        );
    }

    #[test]
    fn test_interpreter_17_inheritance_and_super() {
        assert_eq!(
            output_of(
                "class A { method() { print \"A method\"; } }\n\
                 class B < A {\n\
                   method() { print \"B method\"; }\n\
                   test() { super.method(); }\n\
                 }\n\
                 class C < B {}\n\
                 C().test();\n\
                 C().method();"
            ),
            "A method\nB method\n"
        );
    }

    #[test]
    fn test_interpreter_18_property_errors() {
        assert_eq!(
            runtime_error("var x = 1; print x.y;").0,
            "Only instances have properties."
        );
        assert_eq!(runtime_error("var x = 1; x.y = 2;").0, "Only instances have fields.");
        assert_eq!(
            runtime_error("class A {} A().missing;").0,
            "Undefined property 'missing'."
        );
        assert_eq!(
            runtime_error("var NotClass = \"x\";\nclass A < NotClass {}"),
            ("Superclass must be a class.".to_string(), 2)
        );
    }

    #[test]
    fn test_interpreter_19_to_string() {
        assert_eq!(
            output_of(
                "class P { toString() { return \"P!\"; } }\n\
                 class Q { toString(x) { return \"never\"; } }\n\
                 print P();\n\
                 print Q();"
            ),
            "P!\nQ instance\n"
        );
    }

    #[test]
    fn test_interpreter_20_array_builtin() {
        assert_eq!(
            output_of(
                "var a = array();\n\
                 a.append(1);\n\
                 a.append(\"two\");\n\
                 print a.size();\n\
                 print a.get(1.9);\n\
                 a.set(0, 5);\n\
                 print a.get(0);\n\
                 print a.pop();\n\
                 print a.size();"
            ),
            "2\ntwo\n5\ntwo\n1\n"
        );

        assert_eq!(
            runtime_error("var a = array(); a.append(1);\na.get(3);"),
            ("Index 3 out of range.".to_string(), 2)
        );
        assert_eq!(
            runtime_error("array().get(\"0\");").0,
            "Indexes can only be numbers."
        );
        assert_eq!(
            runtime_error("array().pop();").0,
            "Cannot pop from an empty array."
        );
    }

    #[test]
    fn test_interpreter_21_array_subclass() {
        assert_eq!(
            output_of(
                "class Stack < array {\n\
                   push(v) { this.append(v); }\n\
                 }\n\
                 var s = Stack();\n\
                 s.push(1); s.push(2);\n\
                 print s.pop() + s.size();"
            ),
            "3\n"
        );
    }

    #[test]
    fn test_interpreter_22_input_and_parse_number() {
        let (mut lox, out) = session("  42 \nnot a number\n");

        lox.run("var n = parseNumber(input()); print n + 1;")
            .unwrap();
        let diagnostics = lox.run("parseNumber(input());").unwrap_err();
        lox.run("print input();").unwrap();

        assert_eq!(out.contents(), "43\nnil\n");
        assert_eq!(
            messages(&diagnostics),
            vec!["Cannot parse 'not a number' as a number."]
        );
    }

    #[test]
    fn test_interpreter_23_static_errors_stop_before_running() {
        let (out, result) = run("print \"unreached\";\n{ var a = a; }");

        assert_eq!(out, "");
        assert_eq!(result.unwrap_err().exit_code(), 65);
    }

    #[test]
    fn test_interpreter_24_session_survives_errors() {
        let (mut lox, out) = session("");

        assert!(lox.run("var x = 10; print missing;").is_err());
        lox.run("print x;").unwrap();

        assert_eq!(out.contents(), "10\n");
    }

    #[test]
    fn test_interpreter_25_repl_echoes_expressions() {
        let (mut lox, out) = session("");

        lox.run_line("var x = 10;").unwrap();
        lox.run_line("x * 2;").unwrap();
        lox.run_line("fun twice(f) { return f(f(1)); }").unwrap();
        lox.run_line("fun inc(n) { return n + 1; }").unwrap();
        lox.run_line("twice(inc);").unwrap();
        lox.run_line("print \"done\";").unwrap();

        assert_eq!(out.contents(), "20\n3\ndone\n");
    }

    #[test]
    fn test_interpreter_26_runaway_recursion_is_a_runtime_error() {
        let diagnostics = errors_of("fun f(n) { return f(n + 1); }\nf(0);");

        assert_eq!(diagnostics.exit_code(), 70);
        assert_eq!(messages(&diagnostics), vec!["Stack overflow."]);
    }

    #[test]
    fn test_interpreter_27_deterministic_output() {
        let program = "class A { init(n) { this.n = n; } toString() { return \"A\" + this.n; } }\n\
                       for (var i = 0; i < 3; i = i + 1) print A(i);";

        assert_eq!(output_of(program), output_of(program));
        assert_eq!(output_of(program), "A0\nA1\nA2\n");
    }

    #[test]
    fn test_interpreter_28_nan_index_is_out_of_range() {
        assert_eq!(
            runtime_error("var a = array();\nprint a.get(0/0);"),
            ("Index NaN out of range.".to_string(), 2)
        );

        let (out, result) = run("var a = array(); a.append(7);\nprint a.get(0/0);");
        assert_eq!(out, "");
        assert_eq!(messages(&result.unwrap_err()), vec!["Index NaN out of range."]);

        assert_eq!(
            runtime_error("var a = array(); a.append(7); a.set(1/0, 1);").0,
            "Index inf out of range."
        );
    }

    #[test]
    fn test_interpreter_29_self_returning_to_string_hits_depth_guard() {
        let (out, result) = run("class A { toString() { return this; } }\nprint A();");
        let diagnostics = result.unwrap_err();

        assert_eq!(out, "");
        assert_eq!(diagnostics.exit_code(), 70);
        assert_eq!(diagnostics.to_string(), "Stack overflow.\n[line 2]");
    }

    #[test]
    fn test_interpreter_30_deeply_nested_frames_fit_under_the_cap() {
        let f = "fun f(n) { { { { { { { { if (n == 0) return 0; \
                 return 1 + (1 + (1 + (f(n - 1) - 2))); } } } } } } } }\n";

        assert_eq!(output_of(&format!("{}print f(255);", f)), "255\n");
        assert_eq!(
            messages(&errors_of(&format!("{}print f(300);", f))),
            vec!["Stack overflow."]
        );
    }
}
