pub mod expr;
pub mod parser;

pub use parser::Parser;

#[cfg(test)]
mod tests {
    use super::*;
    use volt_lexer::Lexer;
    use volt_syntax::ast::*;
    use volt_syntax::error::ErrorKind;

    fn parse_expr_str(input: &str) -> Expr {
        let tokens = Lexer::new(&format!("{{{{ {} }}}}", input)).tokenize().expect("Lexing should succeed");
        let mut parser = Parser::new(tokens);
        parser.advance();
        parser.parse_expr().expect("Parsing should succeed")
    }

    fn parse_template_str(input: &str) -> Template {
        let tokens = Lexer::new(input).tokenize().expect("Lexing should succeed");
        Parser::new(tokens).parse_template().expect("Parsing should succeed")
    }

    fn count(input: &str) -> usize {
        parse_template_str(input).body.len()
    }

    fn parse_err(input: &str) -> volt_syntax::Error {
        let tokens = Lexer::new(input).tokenize().expect("Lexing should succeed");
        Parser::new(tokens).parse_template().unwrap_err()
    }

    #[test]
    fn test_empty_and_comments() {
        assert_eq!(count(""), 0);
        assert_eq!(count("{# hello #}"), 0);
        assert_eq!(count("{# hello #}{# other comment #}"), 0);
        assert_eq!(count("{# some comment #}{{ \"hello\" }}{# other comment }}"), 1);
    }

    #[test]
    fn test_nodes_are_not_merged() {
        assert_eq!(count("hello"), 1);
        assert_eq!(count("{{ \"hello\" }}{{ \"hello\" }}"), 2);
        assert_eq!(count("{{ \"hello\" }}-{{ \"hello\" }}"), 3);
        assert_eq!(count("-{{ \"hello\" }}{{ \"hello\" }}-"), 4);
        assert_eq!(count("-{{ \"hello\" }}-{{ \"hello\" }}-"), 5);
        assert_eq!(count("Some = {{ 100~50 }}"), 2);
    }

    #[test]
    fn test_literal_expressions() {
        assert_eq!(parse_expr_str("1"), Expr::Literal(Literal::Integer("1".into())));
        assert_eq!(parse_expr_str("1.2"), Expr::Literal(Literal::Double("1.2".into())));
        assert_eq!(parse_expr_str("\"hello\""), Expr::Literal(Literal::Str("hello".into())));
        assert_eq!(parse_expr_str("true"), Expr::Literal(Literal::Bool(true)));
        assert_eq!(parse_expr_str("null"), Expr::Literal(Literal::Null));
    }

    #[test]
    fn test_operator_precedence() {
        assert!(matches!(parse_expr_str("1 + 2 * 3"), Expr::Binary(BinaryOp::Add, _, _)));
        assert!(matches!(parse_expr_str("a == b and c == d"), Expr::Binary(BinaryOp::And, _, _)));
        assert!(matches!(parse_expr_str("a or b and c"), Expr::Binary(BinaryOp::Or, _, _)));
        assert!(matches!(parse_expr_str("not a == b"), Expr::Unary(UnaryOp::Not, _)));
        assert!(matches!(parse_expr_str("a ~ b + c"), Expr::Binary(BinaryOp::Concat, _, _)));
        assert!(matches!(parse_expr_str("a ? b : c"), Expr::Ternary(..)));
        assert!(matches!(parse_expr_str("-2 ** 2"), Expr::Unary(UnaryOp::Minus, _)));
    }

    #[test]
    fn test_ranges_keep_order() {
        match parse_expr_str("\"Z\"..\"A\"") {
            Expr::Range(from, to) => {
                assert_eq!(*from, Expr::Literal(Literal::Str("Z".into())));
                assert_eq!(*to, Expr::Literal(Literal::Str("A".into())));
            }
            other => panic!("Expected Range, got {:?}", other),
        }
        // filters bind tighter than ranges
        assert!(matches!(parse_expr_str("\"a\"..\"z\"|join(\",\")"), Expr::Range(..)));
    }

    #[test]
    fn test_unary_and_postfix() {
        assert!(matches!(parse_expr_str("!!10"), Expr::Unary(UnaryOp::Not, _)));
        assert!(matches!(parse_expr_str("10--"), Expr::Unary(UnaryOp::PostDecrement, _)));
        assert!(matches!(parse_expr_str("a++"), Expr::Unary(UnaryOp::PostIncrement, _)));
    }

    #[test]
    fn test_access_chains() {
        assert!(matches!(parse_expr_str("a[0][1.2][false][true][b]"), Expr::Index(..)));
        assert!(matches!(parse_expr_str("a.b.c"), Expr::Property(_, Member::Named(_))));
        assert!(matches!(parse_expr_str("a.(b.c)"), Expr::Property(_, Member::Computed(_))));
        assert!(matches!(parse_expr_str("(a.b).c"), Expr::Property(..)));
        assert!(matches!(parse_expr_str("items[1:3]"), Expr::Slice { .. }));
        assert!(matches!(parse_expr_str("items[:3]"), Expr::Slice { start: None, .. }));
        assert!(matches!(parse_expr_str("a[0]('hello')"), Expr::Call { .. }));
    }

    #[test]
    fn test_function_calls() {
        match parse_expr_str("form('action': 'save/products', 'method': other_func(1, 2, 3))") {
            Expr::Call { callee, args } => {
                assert_eq!(*callee, Expr::Variable("form".into()));
                assert_eq!(args.len(), 2);
                assert_eq!(args[0].name.as_deref(), Some("action"));
                assert!(matches!(args[1].value, Expr::Call { .. }));
            }
            other => panic!("Expected Call, got {:?}", other),
        }
        match parse_expr_str("image('img/logo.png', width: 80)") {
            Expr::Call { args, .. } => {
                assert_eq!(args[0].name, None);
                assert_eq!(args[1].name.as_deref(), Some("width"));
            }
            other => panic!("Expected Call, got {:?}", other),
        }
        assert!(matches!(parse_expr_str("user.session.get(request.getPost('token'))"), Expr::Call { .. }));
    }

    #[test]
    fn test_array_and_map_literals() {
        if let Expr::Array(items) = parse_expr_str("[\"hello\", 2, 3, false, true, null, [1, 2, \"hola\"]]") {
            assert_eq!(items.len(), 7);
        } else {
            panic!("Expected Array");
        }
        if let Expr::Map(pairs) = parse_expr_str("['first': 1, 'second': 2, 'third': 3]") {
            assert_eq!(pairs.len(), 3);
            assert_eq!(pairs[0].0, Expr::Literal(Literal::Str("first".into())));
        } else {
            panic!("Expected Map");
        }
        if let Expr::Map(pairs) = parse_expr_str("{name: 'x'}") {
            assert_eq!(pairs[0].0, Expr::Literal(Literal::Str("name".into())));
        } else {
            panic!("Expected Map");
        }
        assert_eq!(parse_expr_str("[]"), Expr::Array(Vec::new()));
    }

    #[test]
    fn test_filters_chain_left_to_right() {
        match parse_expr_str("(\"hello\" ~ \"lol\")|e|length") {
            Expr::Filter { expr, filter, .. } => {
                assert_eq!(filter, FilterName::Named("length".into()));
                assert!(matches!(*expr, Expr::Filter { .. }));
            }
            other => panic!("Expected Filter, got {:?}", other),
        }
        assert!(matches!(
            parse_expr_str("\"hello\"|(a-1)"),
            Expr::Filter { filter: FilterName::Computed(_), .. }
        ));
        assert!(matches!(parse_expr_str("x|raw"), Expr::Filter { filter: FilterName::Named(_), .. }));
    }

    #[test]
    fn test_is_tests_and_comparisons() {
        assert!(matches!(parse_expr_str("a is defined"), Expr::Test { negated: false, .. }));
        assert!(matches!(parse_expr_str("a is not empty"), Expr::Test { negated: true, .. }));
        assert!(matches!(parse_expr_str("a is sameas(b)"), Expr::Test { args: Some(_), .. }));
        assert!(matches!(parse_expr_str("a is 100"), Expr::Binary(BinaryOp::Is, _, _)));
        assert!(matches!(parse_expr_str("a is not 100"), Expr::Binary(BinaryOp::IsNot, _, _)));
        assert!(matches!(parse_expr_str("a not in b"), Expr::Binary(BinaryOp::NotIn, _, _)));
    }

    #[test]
    fn test_statements() {
        for src in [
            "{% if a==b %} hello {% endif %}",
            "{% if a==b %} hello {% else %} not hello {% endif %}",
            "{% if a==b %} {% if c==d %} hello {% endif %} {% else %} not hello {% endif %}",
            "{% for a in 1..10 if a < 5 and a > 7 %} hello {% endfor %}",
            "{% for k, v in [1, 2, 3] if v is odd %} hello {% endfor %}",
            "{% for v in [1, 2, 3] %} {% break %} {% endfor %}",
            "{% set a = 1.2+1*(20/b) and c %}",
            "{% set a[0].y = 1 %}",
            "{% set a.y[0] = 1 %}",
            "{% do super()|e %}",
            "{% autoescape false %} {% endautoescape %}",
            "{% block hello %}{% endblock %}",
            "{% extends \"some/file.volt\" %}",
            "{% include \"some/file.volt\" %}",
            "{% cache sidebar 500 %} hello {% endcache %}",
            "{% raw %}{{ x }}{% endraw %}",
        ] {
            assert_eq!(count(src), 1, "{}", src);
        }
    }

    #[test]
    fn test_if_branches() {
        let t = parse_template_str("{% if a %}1{% elseif b %}2{% else %}3{% endif %}");
        match &t.body[0] {
            Stmt::If { branches, else_body } => {
                assert_eq!(branches.len(), 2);
                assert_eq!(else_body.as_ref().map(|b| b.len()), Some(1));
            }
            other => panic!("Expected If, got {:?}", other),
        }
    }

    #[test]
    fn test_for_loop_details() {
        let t = parse_template_str("{% for k, v in items %}{% continue %}{% elsefor %}none{% endfor %}");
        match &t.body[0] {
            Stmt::For(f) => {
                assert_eq!(f.key.as_deref(), Some("k"));
                assert_eq!(f.value, "v");
                assert!(f.has_continue);
                assert!(!f.has_break);
                assert!(f.else_body.is_some());
            }
            other => panic!("Expected For, got {:?}", other),
        }
    }

    #[test]
    fn test_set_compound_assignments() {
        let t = parse_template_str("{% set a = 1, b += 2 %}");
        match &t.body[0] {
            Stmt::Set(assignments) => {
                assert_eq!(assignments.len(), 2);
                assert_eq!(assignments[1].op, AssignOp::Add);
            }
            other => panic!("Expected Set, got {:?}", other),
        }
    }

    #[test]
    fn test_macro_params() {
        let t = parse_template_str("{% macro input(name, class='x') %}{% return name %}{% endmacro %}");
        match &t.body[0] {
            Stmt::Macro { name, params, body } => {
                assert_eq!(name, "input");
                assert_eq!(params.len(), 2);
                assert!(params[0].default.is_none());
                assert!(params[1].default.is_some());
                assert!(matches!(body[0], Stmt::Return(_)));
            }
            other => panic!("Expected Macro, got {:?}", other),
        }
    }

    #[test]
    fn test_syntax_errors_ignore_trailing_text() {
        for src in ["{{ a + }}", "{{ a + }}\n", "{{ a + }}tail"] {
            assert_eq!(parse_err(src).to_string(), "Syntax error, unexpected token }} on line 1");
        }
        assert_eq!(parse_err("x\n{% if %}").to_string(), "Syntax error, unexpected token %} on line 2");
        assert_eq!(parse_err("{{ }}\n").to_string(), "Syntax error, unexpected EOF");
        assert_eq!(parse_err("{% %}").to_string(), "Syntax error, unexpected EOF");
    }

    // Line numbers are physical source lines: each input puts the offending
    // token on the line a reader would count in the template text.
    #[test]
    fn test_syntax_errors() {
        assert_eq!(parse_err("{{").to_string(), "Syntax error, unexpected EOF");
        assert_eq!(parse_err("{{ }}").to_string(), "Syntax error, unexpected EOF");
        assert_eq!(parse_err("{{ ++v }}").to_string(), "Syntax error, unexpected token ++ on line 1");
        assert_eq!(
            parse_err("{{\n\t\t\t\t++v }}").to_string(),
            "Syntax error, unexpected token ++ on line 2"
        );
        assert_eq!(
            parse_err("{{\n\n\n\t\t\t\tif\n\t\t\tfor }}").to_string(),
            "Syntax error, unexpected token IF on line 4"
        );
        assert_eq!(
            parse_err("{% block some %}\n{% for x in y %}\n{{ .\"hello\".y }}\n{% endfor %}\n{% endblock %}").to_string(),
            "Syntax error, unexpected token DOT on line 3"
        );
        assert_eq!(
            parse_err("{#\n\nmulti-line\n\n#}{% block some %}\n{# one #}\n{% for x in y %}\n{{ \"hello\"++y }}\n{% endfor %}\n{% endblock %}")
                .to_string(),
            "Syntax error, unexpected token IDENTIFIER(y) on line 8"
        );
        assert_eq!(
            parse_err("{# Hello #}\n\n{% for robot in robots %}\n{{ link_to(\"hello\", robot.id ~ ~ robot.name) }}\n{% endfor %}\n")
                .to_string(),
            "Syntax error, unexpected token ~ on line 4"
        );
    }

    #[test]
    fn test_block_stack_errors() {
        assert_eq!(parse_err("{% if a %}").to_string(), "Syntax error, unexpected EOF");
        assert_eq!(
            parse_err("{% if a %}{% endfor %}x").to_string(),
            "Syntax error, unexpected token ENDFOR on line 1"
        );
        assert_eq!(
            parse_err("{% break %}x").to_string(),
            "Syntax error, unexpected token BREAK on line 1"
        );
        assert_eq!(
            parse_err("{% for a in b %}{% macro m() %}{% continue %}{% endmacro %}{% endfor %}").kind,
            ErrorKind::Syntax
        );
        assert_eq!(
            parse_err("{% if a %}{% else %}{% else %}{% endif %}").to_string(),
            "Syntax error, unexpected token ELSE on line 1"
        );
    }

    #[test]
    fn test_extends_must_be_first() {
        for src in [
            "{{ \"hello\"}}{% extends \"some/file.volt\" %}",
            "<div>{% extends \"some/file.volt\" %}{% set a = 1 %}</div>",
        ] {
            let err = parse_err(src);
            assert_eq!(err.kind, ErrorKind::Structural);
            assert_eq!(
                err.to_string(),
                "Extends statement must be placed at the first line in the template on line 1"
            );
        }
        // leading whitespace and comments are fine
        assert_eq!(count("  {# note #}\n{% extends \"a.volt\" %}\n{% block b %}x{% endblock %}\n"), 2);
    }

    #[test]
    fn test_child_templates_only_contain_blocks() {
        for src in [
            "{% extends \"some/file.volt\" %}{{ \"hello\"}}",
            "{% extends \"some/file.volt\" %}{{% if true %}} {%endif%}",
            "{% extends \"some/file.volt\" %}{{% set a = 1 %}",
            "{% extends \"some/file.volt\" %}text",
            "{% extends \"some/file.volt\" %}{% set a = 1 %}",
        ] {
            let err = parse_err(src);
            assert_eq!(err.kind, ErrorKind::Structural, "{}", src);
            assert_eq!(err.to_string(), "Child templates only may contain blocks on line 1");
        }
    }
}
