//! Parses realistic browser-style scripts end to end and checks the shape
//! of errors reported for broken buffers.

use augur_core::ast::{ClassMemberKind, ExprKind, StmtKind};
use augur_core::{lex, parse, Position, Token};

const SCRIPT: &str = r#"#!/usr/bin/env node
'use strict';

/* A small widget library. */
var Widget = function (el, opts) {
  this.el = el;
  this.opts = opts || {};
  this.listeners = [];
};

Widget.prototype.on = function (name, fn) {
  this.listeners.push({ name: name, fn: fn });
  return this;
};

Widget.prototype.emit = function (name) {
  for (var i = 0; i < this.listeners.length; i++) {
    if (this.listeners[i].name === name) this.listeners[i].fn();
  }
};

class Panel extends Widget {
  constructor(el) {
    super(el, { closable: true });
    this.title = `Panel ${el.id}`;
  }
  static create(id) { return new Panel(document.getElementById(id)); }
  get open() { return !this.el.hidden; }
}

const pattern = /^[a-z]+$/gi;
let total = [1, 2, 3].map(n => n * 2).reduce((a, b) => a + b, 0);
var w = new Widget(document.body)
w.on('click', function () { total += 1 })
  .emit('click')
"#;

#[test]
fn parses_a_realistic_script() {
    let program = parse(SCRIPT).expect("script parses");
    assert_eq!(program.body.len(), 9);

    let StmtKind::Class(panel) = &program.body[4].kind else {
        panic!("expected class, got {:?}", program.body[4].kind);
    };
    assert_eq!(panel.id.as_ref().map(|i| i.name.as_str()), Some("Panel"));
    let kinds: Vec<_> = panel
        .members
        .iter()
        .map(|m| match m.kind {
            ClassMemberKind::Constructor(_) => "ctor",
            ClassMemberKind::Method(_) => "method",
            ClassMemberKind::Get(_) => "get",
            ClassMemberKind::Set(_) => "set",
            ClassMemberKind::Field(_) => "field",
        })
        .collect();
    assert_eq!(kinds, ["ctor", "method", "get"]);
    assert!(panel.members[1].is_static);

    // The chained call continues across the newline.
    let StmtKind::Expr(last) = &program.body[8].kind else {
        panic!("expected expression statement");
    };
    assert!(matches!(last.kind, ExprKind::Call { .. }));
    assert_eq!(last.span.start_pos, Position::new(33, 0));
}

#[test]
fn prototype_assignment_targets_are_member_chains() {
    let program = parse(SCRIPT).expect("script parses");
    let StmtKind::Expr(expr) = &program.body[2].kind else {
        panic!("expected expression statement");
    };
    let ExprKind::Assign { target, value, .. } = &expr.kind else {
        panic!("expected assignment");
    };
    assert!(matches!(target.kind, ExprKind::Member { .. }));
    assert!(matches!(value.kind, ExprKind::Function(_)));
}

#[test]
fn lexer_positions_are_zero_based_character_columns() {
    let tokens = lex("var é = 'ü';\n  é.x").expect("lexes");
    let dot = tokens
        .iter()
        .find(|t| t.token == Token::Dot)
        .expect("has a dot");
    assert_eq!(dot.span.start_pos, Position::new(1, 3));
    assert!(!dot.newline_before);
    let second_e = &tokens[5];
    assert!(second_e.newline_before);
}

#[test]
fn syntax_errors_serialize_with_positions() {
    let err = parse("var a = {\n  b: 1,\n  c:\n").unwrap_err();
    let json = serde_json::to_value(&err).expect("serializes");
    assert_eq!(json["position"]["line"], 3);
    assert!(json["message"].as_str().is_some());
    assert!(err.to_string().starts_with("syntax error at 4:1"));
}

#[test]
fn unterminated_literals_are_errors() {
    assert!(parse("var s = 'abc").is_err());
    assert!(parse("var t = `abc").is_err());
    assert!(parse("/* open").is_err());
}
