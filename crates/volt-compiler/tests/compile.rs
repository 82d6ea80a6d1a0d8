use volt_compiler::{Compiler, Mapping, MemoryLoader};

fn check(cases: &[(&str, &str)]) {
    let compiler = Compiler::new();
    for (src, expected) in cases {
        let got = compiler.compile_string(src).unwrap_or_else(|e| panic!("{}: {}", src, e));
        assert_eq!(&got, expected, "compiling {}", src);
    }
}

#[test]
fn test_text_and_comments() {
    check(&[
        ("", ""),
        ("{# hello #}", ""),
        ("{# hello #}{# other comment #}", ""),
        ("hello", "hello"),
        ("{# some comment #}{{ \"hello\" }}{# other comment }}", "<?= 'hello' ?>"),
    ]);
}

#[test]
fn test_common_expressions() {
    check(&[
        (r#"{{ "hello" }}"#, "<?= 'hello' ?>"),
        (r#"{{ "hello" }}{{ "hello" }}"#, "<?= 'hello' ?><?= 'hello' ?>"),
        (r#"{{ "hello" }}-{{ "hello" }}"#, "<?= 'hello' ?>-<?= 'hello' ?>"),
        (r#"-{{ "hello" }}{{ "hello" }}-"#, "-<?= 'hello' ?><?= 'hello' ?>-"),
        (r#"-{{ "hello" }}-{{ "hello" }}-"#, "-<?= 'hello' ?>-<?= 'hello' ?>-"),
        ("Some = {{ 100+50 }}", "Some = <?= 100 + 50 ?>"),
        ("Some = {{ 100-50 }}", "Some = <?= 100 - 50 ?>"),
        ("Some = {{ 100*50 }}", "Some = <?= 100 * 50 ?>"),
        ("Some = {{ 100/50 }}", "Some = <?= 100 / 50 ?>"),
        ("Some = {{ 100%50 }}", "Some = <?= 100 % 50 ?>"),
        ("Some = {{ 100~50 }}", "Some = <?= 100 . 50 ?>"),
    ]);
}

#[test]
fn test_unary_operators() {
    check(&[
        ("{{ -10 }}", "<?= -10 ?>"),
        ("{{ !10 }}", "<?= !10 ?>"),
        ("{{ !a }}", "<?= !$a ?>"),
        ("{{ not a }}", "<?= !$a ?>"),
    ]);
}

#[test]
fn test_arrays() {
    check(&[
        ("{% set a = [1, 2, 3, 4] %}", "<?php $a = [1, 2, 3, 4]; ?>"),
        (
            r#"{% set a = ["hello", 2, 1.3, false, true, null] %}"#,
            "<?php $a = ['hello', 2, 1.3, false, true, null]; ?>",
        ),
        (
            r#"{% set a = ["hello", 2, 3, false, true, null, [1, 2, "hola"]] %}"#,
            "<?php $a = ['hello', 2, 3, false, true, null, [1, 2, 'hola']]; ?>",
        ),
        (
            "{% set a = ['first': 1, 'second': 2, 'third': 3] %}",
            "<?php $a = ['first' => 1, 'second' => 2, 'third' => 3]; ?>",
        ),
    ]);
}

#[test]
fn test_access() {
    check(&[
        ("{{ a[0 ]}}", "<?= $a[0] ?>"),
        ("{{ a[0 ] [ 1]}}", "<?= $a[0][1] ?>"),
        (r#"{{ a[0]  [ "hello"] }}"#, "<?= $a[0]['hello'] ?>"),
        ("{{ a[0] [1.2] [false] [true] }}", "<?= $a[0][1.2][false][true] ?>"),
        ("{{ a.b }}", "<?= $a->b ?>"),
        ("{{ a.b.c }}", "<?= $a->b->c ?>"),
    ]);
}

#[test]
fn test_ranges() {
    check(&[
        ("{{ 1..100 }}", "<?= range(1, 100) ?>"),
        (r#"{{ "Z".."A" }}"#, "<?= range('Z', 'A') ?>"),
        ("{{ 'a'..'z' }}", "<?= range('a', 'z') ?>"),
        ("{{ 'a' .. 'z' }}", "<?= range('a', 'z') ?>"),
    ]);
}

#[test]
fn test_function_calls() {
    check(&[
        ("{{ content() }}", "<?= $this->getContent() ?>"),
        ("{{ get_content() }}", "<?= $this->getContent() ?>"),
        ("{{ partial('hello/x') }}", "<?= $this->partial('hello/x') ?>"),
        ("{{ dump(a) }}", "<?= var_dump($a) ?>"),
        ("{{ date('Y-m-d', time()) }}", "<?= date('Y-m-d', time()) ?>"),
        ("{{ robots.getPart(a) }}", "<?= $robots->getPart($a) ?>"),
        ("{{ url('about') }}", "<?= $this->url->get('about') ?>"),
        ("{{ static_url('css/a.css') }}", "<?= $this->url->getStatic('css/a.css') ?>"),
        ("{{ version() }}", "<?= Phalcon\\Version::get() ?>"),
    ]);
}

#[test]
fn test_tag_helpers() {
    check(&[
        ("{{ link_to('hello', 'some-link') }}", "<?= $this->tag->linkTo(['hello', 'some-link']) ?>"),
        (
            "{{ form('action': 'save/products', 'method': 'post') }}",
            "<?= $this->tag->form(['action' => 'save/products', 'method' => 'post']) ?>",
        ),
        (
            "{{ stylesheet_link(config.cdn.css.bootstrap, config.cdn.local) }}",
            "<?= $this->tag->stylesheetLink($config->cdn->css->bootstrap, $config->cdn->local) ?>",
        ),
        ("{{ javascript_include('js/some.js') }}", "<?= $this->tag->javascriptInclude('js/some.js') ?>"),
        ("{{ image('img/logo.png', 'width': 80) }}", "<?= $this->tag->image(['img/logo.png', 'width' => 80]) ?>"),
        (
            "{{ email_field('email', 'class': 'form-control', 'placeholder': 'Email Address') }}",
            "<?= $this->tag->emailField(['email', 'class' => 'form-control', 'placeholder' => 'Email Address']) ?>",
        ),
    ]);
}

#[test]
fn test_filters() {
    check(&[
        (r#"{{ "hello"|e }}"#, "<?= $this->escaper->escapeHtml('hello') ?>"),
        (r#"{{ "hello"|escape }}"#, "<?= $this->escaper->escapeHtml('hello') ?>"),
        (r#"{{ "hello"|trim }}"#, "<?= trim('hello') ?>"),
        (r#"{{ "hello"|striptags }}"#, "<?= strip_tags('hello') ?>"),
        (r#"{{ "hello"|json_encode }}"#, "<?= json_encode('hello') ?>"),
        (r#"{{ "hello"|url_encode }}"#, "<?= urlencode('hello') ?>"),
        (r#"{{ "hello"|uppercase }}"#, "<?= Phalcon\\Text::upper('hello') ?>"),
        (r#"{{ "hello"|lowercase }}"#, "<?= Phalcon\\Text::lower('hello') ?>"),
        (
            r#"{{ ("hello" ~ "lol")|e|length }}"#,
            "<?= $this->length($this->escaper->escapeHtml(('hello' . 'lol'))) ?>",
        ),
        (
            r#"{{ "My name is %s, %s"|format(name, "thanks") }}"#,
            "<?= sprintf('My name is %s, %s', $name, 'thanks') ?>",
        ),
        (
            r#"{{ "some name"|convert_encoding("utf-8", "latin1") }}"#,
            "<?= $this->convertEncoding('some name', 'utf-8', 'latin1') ?>",
        ),
    ]);
}

#[test]
fn test_if_statements() {
    check(&[
        ("{% if a==b %} hello {% endif %}", "<?php if ($a == $b) { ?> hello <?php } ?>"),
        ("{% if a!=b %} hello {% endif %}", "<?php if ($a != $b) { ?> hello <?php } ?>"),
        ("{% if a is not b %} hello {% endif %}", "<?php if ($a != $b) { ?> hello <?php } ?>"),
        ("{% if a<b %} hello {% endif %}", "<?php if ($a < $b) { ?> hello <?php } ?>"),
        ("{% if a>b %} hello {% endif %}", "<?php if ($a > $b) { ?> hello <?php } ?>"),
        ("{% if a>=b %} hello {% endif %}", "<?php if ($a >= $b) { ?> hello <?php } ?>"),
        ("{% if a<=b %} hello {% endif %}", "<?php if ($a <= $b) { ?> hello <?php } ?>"),
        ("{% if a===b %} hello {% endif %}", "<?php if ($a === $b) { ?> hello <?php } ?>"),
        ("{% if a!==b %} hello {% endif %}", "<?php if ($a !== $b) { ?> hello <?php } ?>"),
        ("{% if a==b and c==d %} hello {% endif %}", "<?php if ($a == $b && $c == $d) { ?> hello <?php } ?>"),
        ("{% if a==b or c==d %} hello {% endif %}", "<?php if ($a == $b || $c == $d) { ?> hello <?php } ?>"),
        (
            "{% if a==b %} hello {% elseif c %} other {% else %} none {% endif %}",
            "<?php if ($a == $b) { ?> hello <?php } elseif ($c) { ?> other <?php } else { ?> none <?php } ?>",
        ),
        (
            "{% if a==b %} hello {% else %} not hello {% endif %}",
            "<?php if ($a == $b) { ?> hello <?php } else { ?> not hello <?php } ?>",
        ),
        (
            "{% if a==b %} {% if c==d %} hello {% endif %} {% else %} not hello {% endif %}",
            "<?php if ($a == $b) { ?> <?php if ($c == $d) { ?> hello <?php } ?> <?php } else { ?> not hello <?php } ?>",
        ),
        (
            "{% if a==b %} {% if c==d %} hello {% else %} not hello {% endif %}{% endif %}",
            "<?php if ($a == $b) { ?> <?php if ($c == $d) { ?> hello <?php } else { ?> not hello <?php } ?><?php } ?>",
        ),
        (
            "{% if a==b %} hello {% else %} {% if c==d %} not hello {% endif %} {% endif %}",
            "<?php if ($a == $b) { ?> hello <?php } else { ?> <?php if ($c == $d) { ?> not hello <?php } ?> <?php } ?>",
        ),
    ]);
}

#[test]
fn test_is_tests() {
    check(&[
        ("{% if a is odd %} hello {% endif %}", "<?php if (((($a) % 2) != 0)) { ?> hello <?php } ?>"),
        ("{% if a is even %} hello {% endif %}", "<?php if (((($a) % 2) == 0)) { ?> hello <?php } ?>"),
        ("{% if a is empty %} hello {% endif %}", "<?php if (empty($a)) { ?> hello <?php } ?>"),
        ("{% if a is not empty %} hello {% endif %}", "<?php if (!empty($a)) { ?> hello <?php } ?>"),
        ("{% if a is numeric %} hello {% endif %}", "<?php if (is_numeric($a)) { ?> hello <?php } ?>"),
        ("{% if a is not numeric %} hello {% endif %}", "<?php if (!is_numeric($a)) { ?> hello <?php } ?>"),
        ("{% if a is scalar %} hello {% endif %}", "<?php if (is_scalar($a)) { ?> hello <?php } ?>"),
        ("{% if a is not scalar %} hello {% endif %}", "<?php if (!is_scalar($a)) { ?> hello <?php } ?>"),
        (
            "{% if a is iterable %} hello {% endif %}",
            "<?php if ((is_array($a) || ($a) instanceof Traversable)) { ?> hello <?php } ?>",
        ),
        (
            "{% if a is not iterable %} hello {% endif %}",
            "<?php if (!(is_array($a) || ($a) instanceof Traversable)) { ?> hello <?php } ?>",
        ),
        ("{% if a is sameas(false) %} hello {% endif %}", "<?php if (($a) === (false)) { ?> hello <?php } ?>"),
        ("{% if a is sameas(b) %} hello {% endif %}", "<?php if (($a) === ($b)) { ?> hello <?php } ?>"),
        ("{% if a is divisibleby(3) %} hello {% endif %}", "<?php if (((($a) % (3)) == 0)) { ?> hello <?php } ?>"),
        ("{% if a is divisibleby(b) %} hello {% endif %}", "<?php if (((($a) % ($b)) == 0)) { ?> hello <?php } ?>"),
        ("{% if a is defined %} hello {% endif %}", "<?php if (isset($a)) { ?> hello <?php } ?>"),
        ("{% if a is not defined %} hello {% endif %}", "<?php if (!isset($a)) { ?> hello <?php } ?>"),
        (
            "{% if a is empty or a is defined %} hello {% else %} not hello {% endif %}",
            "<?php if (empty($a) || isset($a)) { ?> hello <?php } else { ?> not hello <?php } ?>",
        ),
        (
            "{% if a is even or b is odd %} hello {% else %} not hello {% endif %}",
            "<?php if (((($a) % 2) == 0) || ((($b) % 2) != 0)) { ?> hello <?php } else { ?> not hello <?php } ?>",
        ),
    ]);
}

#[test]
fn test_for_statements() {
    check(&[
        ("{% for a in b %} hello {% endfor %}", "<?php foreach ($b as $a) { ?> hello <?php } ?>"),
        ("{% for a in b[0] %} hello {% endfor %}", "<?php foreach ($b[0] as $a) { ?> hello <?php } ?>"),
        ("{% for a in b.c %} hello {% endfor %}", "<?php foreach ($b->c as $a) { ?> hello <?php } ?>"),
        (
            "{% for key, value in [0, 1, 3, 5, 4] %} hello {% endfor %}",
            "<?php foreach ([0, 1, 3, 5, 4] as $key => $value) { ?> hello <?php } ?>",
        ),
        (
            "{% for key, value in [0, 1, 3, 5, 4] if key!=3 %} hello {% endfor %}",
            "<?php foreach ([0, 1, 3, 5, 4] as $key => $value) { if ($key != 3) { ?> hello <?php } ?><?php } ?>",
        ),
        ("{% for a in 1..10 %} hello {% endfor %}", "<?php foreach (range(1, 10) as $a) { ?> hello <?php } ?>"),
        (
            "{% for a in 1..10 if a is even %} hello {% endfor %}",
            "<?php foreach (range(1, 10) as $a) { if (((($a) % 2) == 0)) { ?> hello <?php } ?><?php } ?>",
        ),
        (
            "{% for a in 1..10 %} {% for b in 1..10 %} hello {% endfor %} {% endfor %}",
            "<?php foreach (range(1, 10) as $a) { ?> <?php foreach (range(1, 10) as $b) { ?> hello <?php } ?> <?php } ?>",
        ),
        (
            "{% for a in 1..10 %}{% break %}{% endfor %}",
            "<?php foreach (range(1, 10) as $a) { ?><?php break; ?><?php } ?>",
        ),
        (
            "{% for a in 1..10 %}{% continue %}{% endfor %}",
            "<?php foreach (range(1, 10) as $a) { ?><?php continue; ?><?php } ?>",
        ),
    ]);
}

#[test]
fn test_loop_context() {
    check(&[(
        "{% for i in 1..5 %}{{ loop.self.index }}{% endfor %}",
        "<?php $_1iterator = range(1, 5); $_1incr = 0; $_1loop = new stdClass(); $_1loop->self = &$_1loop; \
         $_1loop->length = count($_1iterator); $_1loop->index = 1; $_1loop->index0 = 0; \
         $_1loop->revindex = $_1loop->length; $_1loop->revindex0 = $_1loop->length - 1; ?>\
         <?php foreach ($_1iterator as $i) { $_1loop->first = ($_1incr == 0); $_1loop->index = $_1incr + 1; \
         $_1loop->index0 = $_1incr; $_1loop->revindex = $_1loop->length - $_1incr; \
         $_1loop->revindex0 = $_1loop->length - ($_1incr + 1); $_1loop->last = ($_1incr == ($_1loop->length - 1)); ?>\
         <?= $_1loop->self->index ?><?php $_1incr++; } ?>",
    )]);
}

#[test]
fn test_set_statements() {
    check(&[
        ("{% set a = 1 %}", "<?php $a = 1; ?>"),
        ("{% set a = a-1 %}", "<?php $a = $a - 1; ?>"),
        ("{% set a = 1.2 %}", "<?php $a = 1.2; ?>"),
        ("{% set a = 1.2+1*(20/b) and c %}", "<?php $a = 1.2 + 1 * (20 / $b) && $c; ?>"),
        ("{% set a = 1, b += 2 %}", "<?php $a = 1; $b += 2; ?>"),
        ("{% set a[0] = 1, a.b *= 2 %}", "<?php $a[0] = 1; $a->b *= 2; ?>"),
    ]);
}

#[test]
fn test_cache_statements() {
    check(&[
        (
            "{% cache somekey %} hello {% endcache %}",
            "<?php $_cache[$somekey] = $this->di->get('viewCache'); $_cacheKey[$somekey] = $_cache[$somekey]->start($somekey); \
             if ($_cacheKey[$somekey] === null) { ?> hello <?php $_cache[$somekey]->save($somekey); } \
             else { echo $_cacheKey[$somekey]; } ?>",
        ),
        (
            "{% set lifetime = 500 %}{% cache somekey lifetime %} hello {% endcache %}",
            "<?php $lifetime = 500; ?><?php $_cache[$somekey] = $this->di->get('viewCache'); \
             $_cacheKey[$somekey] = $_cache[$somekey]->start($somekey, $lifetime); if ($_cacheKey[$somekey] === null) { ?> \
             hello <?php $_cache[$somekey]->save($somekey, null, $lifetime); } else { echo $_cacheKey[$somekey]; } ?>",
        ),
        (
            "{% cache somekey 500 %} hello {% endcache %}",
            "<?php $_cache[$somekey] = $this->di->get('viewCache'); $_cacheKey[$somekey] = $_cache[$somekey]->start($somekey, 500); \
             if ($_cacheKey[$somekey] === null) { ?> hello <?php $_cache[$somekey]->save($somekey, null, 500); } \
             else { echo $_cacheKey[$somekey]; } ?>",
        ),
    ]);
}

const AUTOESCAPE_SRC: &str = r#"{{ "hello" }}{% autoescape true %}{{ "hello" }}{% autoescape false %}{{ "hello" }}{% endautoescape %}{{ "hello" }}{% endautoescape %}{{ "hello" }}"#;

#[test]
fn test_autoescape_blocks() {
    check(&[(
        AUTOESCAPE_SRC,
        "<?= 'hello' ?><?= $this->escaper->escapeHtml('hello') ?><?= 'hello' ?><?= $this->escaper->escapeHtml('hello') ?><?= 'hello' ?>",
    )]);
}

#[test]
fn test_autoescape_option() {
    let mut compiler = Compiler::new();
    compiler.set_autoescape(true);
    assert_eq!(
        compiler.compile_string(AUTOESCAPE_SRC).unwrap(),
        "<?= $this->escaper->escapeHtml('hello') ?><?= $this->escaper->escapeHtml('hello') ?><?= 'hello' ?>\
         <?= $this->escaper->escapeHtml('hello') ?><?= $this->escaper->escapeHtml('hello') ?>"
    );
}

#[test]
fn test_user_functions() {
    let mut compiler = Compiler::new();
    compiler
        .add_function("random", "mt_rand")
        .add_function("shuffle", Mapping::generator(|args, _| format!("str_shuffle({})", args)))
        .add_function("strtotime", "strtotime");
    assert_eq!(compiler.compile_string("{{ random() }}").unwrap(), "<?= mt_rand() ?>");
    assert_eq!(compiler.compile_string(r#"{{ shuffle("hello") }}"#).unwrap(), "<?= str_shuffle('hello') ?>");
    assert_eq!(compiler.compile_string(r#"{{ strtotime("now") }}"#).unwrap(), "<?= strtotime('now') ?>");
}

#[test]
fn test_user_filters() {
    let mut compiler = Compiler::new();
    compiler
        .add_filter("reverse", "strrev")
        .add_filter("separate", Mapping::generator(|args, _| format!("explode(\",\", {})", args)));
    assert_eq!(compiler.compile_string(r#"{{ "hello"|reverse }}"#).unwrap(), "<?= strrev('hello') ?>");
    assert_eq!(compiler.compile_string(r#"{{ "1,2,3,4"|separate }}"#).unwrap(), "<?= explode(\",\", '1,2,3,4') ?>");
}

#[test]
fn test_runtime_errors() {
    let compiler = Compiler::new();
    for (src, msg) in [
        (r#"{{ "hello"|unknown }}"#, "Unknown filter \"unknown\" in eval code on line 1"),
        (r#"{{ "hello"|unknown(1, 2, 3) }}"#, "Unknown filter \"unknown\" in eval code on line 1"),
        (r#"{{ "hello"|(a-1) }}"#, "Unknown filter type in eval code on line 1"),
    ] {
        assert_eq!(compiler.compile_string(src).unwrap_err().to_string(), msg);
    }
}

#[test]
fn test_compiles_are_independent() {
    let compiler = Compiler::new();
    compiler.compile_string("{% macro m() %}x{% endmacro %}").unwrap();
    // macros do not leak into the next compile
    assert_eq!(compiler.compile_string("{{ m() }}").unwrap(), "<?= m() ?>");
    assert!(compiler.compile_string("{{ a|nope }}").is_err());
    assert_eq!(compiler.compile_string("{{ a }}").unwrap(), "<?= $a ?>");
}

#[test]
fn test_recompiling_is_byte_identical() {
    let loader = MemoryLoader::new()
        .with("base.volt", "{% block head %}<h1>{% endblock %}{% block body %}{% endblock %}")
        .with(
            "mid.volt",
            "{% extends \"base.volt\" %}{% block body %}{% for i in items %}{{ loop.index }}{% endfor %}{% endblock %}\
             {% block zeta %}z{% endblock %}{% block alpha %}a{% endblock %}",
        );
    let mut compiler = Compiler::new().with_loader(loader);
    compiler.add_filter("shout", "strtoupper").add_function("now", Mapping::generator(|_, _| "time()".to_string()));

    let src = "{% extends \"mid.volt\" %}{% block head %}{{ super() }}{{ now() }}{% endblock %}\
               {% block body %}{% macro item(x, y=1) %}{{ x|shout }}{{ y }}{% endmacro %}{{ item('a') }}{{ super() }}{% endblock %}\
               {% block omega %}o{% endblock %}";
    let first = compiler.compile_source(src, "leaf.volt").unwrap();
    let second = compiler.compile_source(src, "leaf.volt").unwrap();
    assert_eq!(first, second);
    assert_eq!(first.dead_blocks, vec!["alpha", "omega", "zeta"]);
    assert!(first.code.contains("$this->callMacro('item', ['a'])"));
    assert!(first.code.contains("<?= time() ?>"));
}
