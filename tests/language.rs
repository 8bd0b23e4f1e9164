mod common;

basalt_test!(arithmetic, "echo 1 + 2 * 3;", ["7"]);

basalt_test!(string_concatenation, "echo 'hello' + ' ' + 'world';", ["hello world"]);

basalt_test!(number_coerces_into_string, "echo 'count: ' + 3;", ["count: 3"]);

basalt_test!(
    variables_and_assignment,
    "let a = 1; let b = 2; a = a + b; echo a;",
    ["3"]
);

basalt_test!(
    ternary,
    "let x = 10; echo x > 5 ? 'big' : 'small';",
    ["big"]
);

basalt_test!(
    compound_assignment,
    "let a = 10; a += 5; a -= 2; a *= 2; a /= 3; echo a;",
    ["8.666666666666666"]
);

basalt_test!(
    increment_decrement,
    "let a = 1; echo a++; echo a; echo ++a; echo a--; echo a;",
    ["1", "2", "3", "3", "2"]
);

basalt_test!(
    while_loop,
    "let i = 0; while i < 3: { echo i; i = i + 1; }",
    ["0", "1", "2"]
);

basalt_test!(
    for_loop,
    "for let i = 0; i < 3; i = i + 1 echo i;",
    ["0", "1", "2"]
);

basalt_test!(
    logical_short_circuit,
    "fn noisy() { echo 'called'; return true; } echo false and noisy(); echo true or noisy();",
    ["false", "true"]
);

basalt_test!(
    function_closures,
    "fn make_counter() { let count = 0; fn increment() { count = count + 1; return count; } return increment; } let counter = make_counter(); echo counter(); echo counter(); echo counter();",
    ["1", "2", "3"]
);

basalt_test!(
    anonymous_function,
    "let add = fn(a, b) { return a + b; }; echo add(2, 3); echo add;",
    ["5", "<fn Anonymous>"]
);

basalt_test!(
    recursive_function,
    "fn fib(n) { if n < 2: return n; return fib(n - 1) + fib(n - 2); } echo fib(8);",
    ["21"]
);

basalt_test!(none_and_booleans, "echo none; echo true; echo false;", ["none", "true", "false"]);

basalt_test!(print_native, "print();", [""]);
