use criterion::{Criterion, criterion_group, criterion_main};
use lambda_sql::{Compiler, CompilerConfig, ast::*};

fn person(body: Node) -> Node {
    lambda_over("Person", 1, body)
}

fn trees() -> Vec<Node> {
    let name = || field(param(0), "getName");
    let age = || field(param(0), "getAge");
    // p -> p.getAge() > 18 && (p.isActive() || !p.getName().startsWith("J"))
    let simple = person(and(
        binary(OperatorKind::GreaterThan, age(), constant(18)),
        or(
            field(param(0), "isActive"),
            not(call(name(), Owner::Text, "startsWith", vec![constant("J")])),
        ),
    ));
    // a closure over a name and a list of ids
    let captured = person(invoke(
        lambda(
            3,
            and(
                binary(OperatorKind::Equal, field(param(2), "getName"), param(0)),
                call(
                    param(1),
                    Owner::Collection,
                    "contains",
                    vec![field(param(2), "getId")],
                ),
            ),
        ),
        vec![
            constant("Steve"),
            constant(vec![1, 2, 3, 5, 8, 13]),
            param(0),
        ],
    ));
    // first.or(second)
    let composed = person(invoke(
        lambda(
            3,
            or(
                invoke(param(0), vec![param(2)]),
                invoke(param(1), vec![param(2)]),
            ),
        ),
        vec![
            constant(lambda_value(simple.clone())),
            constant(lambda_value(captured.clone())),
            param(0),
        ],
    ));
    vec![simple, captured, composed]
}

fn lambda_value(node: Node) -> Value {
    match node {
        Node::Lambda(l) => l.into(),
        _ => unreachable!(),
    }
}

fn compile_all(compiler: &Compiler, trees: &[Node]) {
    // total output length keeps the loop from being optimized out
    let mut len = 0;
    for tree in trees {
        match compiler.compile(std::hint::black_box(tree)) {
            Ok(sql) => len += sql.len(),
            Err(e) => panic!("Unexpected: {e}"),
        }
    }
    assert!(len > 0);
}

fn criterion_benchmark(c: &mut Criterion) {
    let trees = trees();
    let compiler = Compiler::new(CompilerConfig::for_table("person"));
    c.bench_function("compile some predicates", |b| {
        b.iter(|| compile_all(&compiler, &trees))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
