mod common;

basalt_test!(
    instance_fields_and_methods,
    "class Greeter { init(name) { self.name = name; } greet() { return 'hi ' + self.name; } } let g = Greeter('Ada'); echo g.greet();",
    ["hi Ada"]
);

basalt_test!(
    class_and_instance_display,
    "class Point {} let p = Point(); echo Point; echo p;",
    ["<PloxClass Point>", "[<PloxClass Point> instance]"]
);

basalt_test!(
    init_always_returns_self,
    "class Box { init(value) { self.value = value; return; } } let b = Box(1); echo b.value;",
    ["1"]
);

basalt_test!(
    single_inheritance_and_super,
    "class Animal { speak() { return 'some sound'; } } class Dog < Animal > { speak() { return super::speak() + ', woof'; } } let d = Dog(); echo d.speak();",
    ["some sound, woof"]
);

basalt_test!(
    fields_are_per_instance,
    "class Counter { init() { self.n = 0; } bump() { self.n = self.n + 1; return self.n; } } let a = Counter(); let b = Counter(); a.bump(); a.bump(); b.bump(); echo a.n; echo b.n;",
    ["2", "1"]
);

basalt_test!(
    bound_method_value,
    "class Thing { name() { return 'thing'; } } let t = Thing(); let m = t.name; echo m();",
    ["thing"]
);
